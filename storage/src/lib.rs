//! Storage crate: durable persistence of conversation turns.
//!
//! The turns table is the source of truth for the conversation memory; any vector
//! index built on top of it is a derived cache that can be regenerated from
//! [`TurnRepository::select_all_embeddings`].
//!
//! ## Modules
//!
//! - `error` – Storage error types
//! - `models` – TurnRecord, EmbeddingRow, SessionSummary and the embedding byte codec
//! - `turn_repo` – TurnRepository (SQLite)
//! - `sqlite_pool` – SqlitePoolManager

mod error;
mod models;
mod sqlite_pool;
mod turn_repo;

pub use error::StorageError;
pub use models::{decode_embedding, encode_embedding, EmbeddingRow, SessionSummary, TurnRecord};
pub use sqlite_pool::SqlitePoolManager;
pub use turn_repo::TurnRepository;
