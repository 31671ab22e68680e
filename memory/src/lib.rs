//! # Memory Crate
//!
//! Persistent conversational memory. Every user/agent exchange is stored durably; the
//! memory then answers two questions for a caller building a prompt:
//!
//! - **short-term**: what happened recently in *this* session, as a transcript
//!   ([`MemoryManager::get_short_term_history`]);
//! - **long-term**: which exchanges from *other* sessions look like this input
//!   ([`MemoryManager::retrieve_relevant_turns`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use memory::{EnvMemoryConfig, MemoryManager};
//! use openai_embedding::OpenAIEmbedding;
//!
//! # async fn run() -> Result<(), memory::MemoryError> {
//! let embedder = Arc::new(OpenAIEmbedding::with_api_key(String::new()));
//! let manager = MemoryManager::new(EnvMemoryConfig::new("./agent_workspace/memory"), embedder);
//! manager.initialize().await?;
//!
//! manager
//!     .add_turn("run-1", "heap error", &serde_json::json!({ "summary": "OOM" }))
//!     .await?;
//! let recent = manager.get_short_term_history("run-1", 5).await?;
//! let related = manager.retrieve_relevant_turns("heap issue", "run-2", 3).await?;
//! # let _ = (recent, related);
//! manager.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## On-disk layout
//!
//! One working directory with `memory.db` (SQLite, the source of truth) and
//! `faiss.index` (the serialized vector index). The index file is disposable: delete it
//! and the next `initialize()` rebuilds it from the database.
//!
//! ## Modules
//!
//! - [`types`] - ConversationTurn, MemoryStats and SessionSummary
//! - [`config`] - MemoryConfig trait and env loader
//! - [`error`] - MemoryError / IndexError
//! - [`vector_index`] - Flat nearest-neighbor index with file persistence
//! - [`manager`] - MemoryManager facade

pub mod config;
pub mod error;
pub mod manager;
pub mod types;
pub mod vector_index;

pub use config::{EnvMemoryConfig, MemoryConfig, DEFAULT_RECENT_LIMIT, DEFAULT_TOP_K};
pub use error::{IndexError, MemoryError, Result};
pub use manager::MemoryManager;
pub use types::{ConversationTurn, MemoryStats, SessionSummary};
pub use vector_index::{FlatIndex, Neighbor};
