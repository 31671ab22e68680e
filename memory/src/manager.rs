//! # Memory Manager
//!
//! Facade over the turns table ([`TurnRepository`]) and the vector index
//! ([`FlatIndex`]).
//!
//! ## Bootstrap
//!
//! [`MemoryManager::initialize`] creates the schema, then loads the persisted index.
//! When the index file is missing, unreadable, or disagrees with the table on entry
//! count or highest id, the provider is probed once to learn the embedding width and the
//! index is rebuilt from the table and persisted. None of that reaches the caller.
//!
//! ## Locking
//!
//! - `write_lock` serializes row insert + index add + index persist, and bootstrap.
//! - `index` is a read/write lock: searches share it, add+persist holds it exclusively.
//! - Short-term history reads only the table and takes no index lock.
//! - Embedding calls are awaited before any lock is taken.

use crate::config::MemoryConfig;
use crate::error::{MemoryError, Result};
use crate::types::{to_document, ConversationTurn, MemoryStats, SessionSummary};
use crate::vector_index::FlatIndex;
use embedding::{embed_single, EmbeddingService};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use storage::{encode_embedding, TurnRepository};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Candidates fetched per requested recall result before the same-session filter.
const OVER_FETCH_FACTOR: usize = 2;
const PROBE_TEXT: &str = "embedding dimension probe";

pub struct MemoryManager {
    config: Box<dyn MemoryConfig>,
    embedder: Arc<dyn EmbeddingService>,
    store: RwLock<Option<TurnRepository>>,
    index: RwLock<Option<FlatIndex>>,
    write_lock: Mutex<()>,
}

impl MemoryManager {
    /// Creates an uninitialized manager. Nothing touches the disk until
    /// [`initialize`](Self::initialize).
    pub fn new(config: impl MemoryConfig + 'static, embedder: Arc<dyn EmbeddingService>) -> Self {
        Self {
            config: Box::new(config),
            embedder,
            store: RwLock::new(None),
            index: RwLock::new(None),
            write_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &dyn MemoryConfig {
        self.config.as_ref()
    }

    /// Opens the database, creates the schema, then loads or rebuilds the index.
    /// Calling it again once it has succeeded does nothing.
    pub async fn initialize(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if self.store.read().await.is_some() {
            debug!("Memory manager already initialized");
            return Ok(());
        }

        let dir = self.config.memory_dir();
        tokio::fs::create_dir_all(dir).await?;
        info!(dir = %dir.display(), "Initializing conversation memory");

        let store = TurnRepository::open(&self.config.db_path()).await?;
        store.init().await?;

        let index = match self.load_or_build(&store).await {
            Ok(index) => index,
            Err(e) => {
                store.close().await;
                return Err(e);
            }
        };
        info!(entries = index.len(), dim = index.dim(), "Conversation memory ready");

        *self.index.write().await = Some(index);
        *self.store.write().await = Some(store);
        Ok(())
    }

    async fn load_or_build(&self, store: &TurnRepository) -> Result<FlatIndex> {
        let path = self.config.index_path();
        let rows = store.count().await?;
        let max_id = store.max_id().await?;

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            match FlatIndex::load(&path).await {
                Ok(index) if index.len() as i64 == rows && index.max_id() == max_id => {
                    return Ok(index)
                }
                Ok(index) => warn!(
                    indexed = index.len(),
                    rows,
                    index_max_id = ?index.max_id(),
                    store_max_id = ?max_id,
                    "Vector index does not match the store, rebuilding"
                ),
                Err(e) => warn!(error = %e, "Vector index file unreadable, rebuilding"),
            }
        } else {
            info!(path = %path.display(), rows, "No vector index file, building");
        }

        self.build_from_store(store).await
    }

    async fn build_from_store(&self, store: &TurnRepository) -> Result<FlatIndex> {
        let dim = self.probe_dimension().await?;
        let index = FlatIndex::rebuild_from_store(store, dim).await?;
        index.persist(&self.config.index_path()).await?;
        Ok(index)
    }

    async fn probe_dimension(&self) -> Result<usize> {
        let vector = self.embed(PROBE_TEXT).await?;
        if vector.is_empty() {
            return Err(MemoryError::EmbeddingProvider(anyhow::anyhow!(
                "embedding provider returned a zero-width vector"
            )));
        }
        debug!(dim = vector.len(), "Probed embedding dimension");
        Ok(vector.len())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        embed_single(self.embedder.as_ref(), text)
            .await
            .map_err(MemoryError::EmbeddingProvider)
    }

    async fn store(&self) -> Result<TurnRepository> {
        self.store.read().await.clone().ok_or(MemoryError::NotInitialized)
    }

    async fn dimension(&self) -> Result<usize> {
        self.index
            .read()
            .await
            .as_ref()
            .map(|index| index.dim())
            .ok_or(MemoryError::NotInitialized)
    }

    /// Width every stored and queried embedding must have, once initialized.
    pub async fn embedding_dim(&self) -> Option<usize> {
        self.dimension().await.ok()
    }

    /// Records one turn and returns its id.
    ///
    /// A response that does not serialize to a JSON object is not memorable: the call
    /// returns `Ok(None)` without embedding or writing anything.
    pub async fn add_turn<R>(
        &self,
        session_id: &str,
        user_input: &str,
        agent_response: &R,
    ) -> Result<Option<i64>>
    where
        R: Serialize + ?Sized,
    {
        let store = self.store().await?;
        let Some(document) = to_document(agent_response) else {
            debug!(session_id, "Agent response is not a JSON object, turn not stored");
            return Ok(None);
        };

        let vector = self.embed(user_input).await?;

        // rebuild_index may swap the index while the provider call is in flight
        let _guard = self.write_lock.lock().await;
        let expected = self.dimension().await?;
        if vector.len() != expected {
            return Err(MemoryError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }

        let id = store
            .insert(session_id, user_input, &document, &encode_embedding(&vector))
            .await?;

        let mut index_guard = self.index.write().await;
        let index = index_guard.as_mut().ok_or(MemoryError::NotInitialized)?;
        index.add(id, &vector)?;
        index.persist(&self.config.index_path()).await?;

        info!(id, session_id, "Stored conversation turn");
        Ok(Some(id))
    }

    /// Up to `limit` most recent turns of `session_id`, oldest first.
    pub async fn get_short_term_history(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>> {
        let store = self.store().await?;
        if limit == 0 {
            return Ok(Vec::new());
        }

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut records = store.select_recent_by_session(session_id, limit).await?;
        records.reverse();

        let turns = records
            .into_iter()
            .map(ConversationTurn::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(turns)
    }

    /// Up to `top_k` turns from other sessions whose input is closest to `query_text`,
    /// closest first. An empty index yields an empty list.
    pub async fn retrieve_relevant_turns(
        &self,
        query_text: &str,
        session_id: &str,
        top_k: usize,
    ) -> Result<Vec<ConversationTurn>> {
        let store = self.store().await?;
        let total = self
            .index
            .read()
            .await
            .as_ref()
            .map(|index| index.len())
            .ok_or(MemoryError::NotInitialized)?;
        if top_k == 0 || total == 0 {
            return Ok(Vec::new());
        }

        let query = self.embed(query_text).await?;
        let mut fetch = top_k.saturating_mul(OVER_FETCH_FACTOR);

        loop {
            let (hits, indexed) = {
                let guard = self.index.read().await;
                let index = guard.as_ref().ok_or(MemoryError::NotInitialized)?;
                (index.search(&query, fetch)?, index.len())
            };

            let ids: Vec<i64> = hits.iter().map(|hit| hit.id).collect();
            let mut by_id: HashMap<i64, _> = store
                .select_by_ids(&ids)
                .await?
                .into_iter()
                .map(|record| (record.id, record))
                .collect();

            let mut turns = Vec::with_capacity(top_k);
            for hit in &hits {
                let Some(record) = by_id.remove(&hit.id) else {
                    continue;
                };
                if record.session_id == session_id {
                    continue;
                }
                turns.push(ConversationTurn::try_from(record)?);
                if turns.len() == top_k {
                    break;
                }
            }

            let exhausted = fetch >= indexed;
            if turns.len() == top_k || exhausted || !self.config.exhaustive_recall() {
                debug!(
                    session_id,
                    candidates = hits.len(),
                    returned = turns.len(),
                    "Retrieved relevant turns"
                );
                return Ok(turns);
            }
            fetch = fetch.saturating_mul(2);
        }
    }

    /// Stored sessions with their turn counts, most recently active first.
    ///
    /// A whole session is read back with [`get_short_term_history`](Self::get_short_term_history)
    /// and a limit of at least its turn count.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let store = self.store().await?;
        Ok(store.select_sessions().await?)
    }

    /// Discards the in-memory index and rebuilds it from the table, re-probing the
    /// provider for the embedding width.
    pub async fn rebuild_index(&self) -> Result<MemoryStats> {
        let store = self.store().await?;
        let _guard = self.write_lock.lock().await;

        let index = self.build_from_store(&store).await?;
        let stats = MemoryStats {
            turns: store.count().await?,
            indexed: index.len(),
            embedding_dim: index.dim(),
        };
        *self.index.write().await = Some(index);

        info!(indexed = stats.indexed, "Vector index rebuilt on request");
        Ok(stats)
    }

    pub async fn stats(&self) -> Result<MemoryStats> {
        let store = self.store().await?;
        let (indexed, embedding_dim) = self
            .index
            .read()
            .await
            .as_ref()
            .map(|index| (index.len(), index.dim()))
            .ok_or(MemoryError::NotInitialized)?;
        Ok(MemoryStats {
            turns: store.count().await?,
            indexed,
            embedding_dim,
        })
    }

    /// Releases the database pool. The index is already on disk, so nothing is
    /// flushed. The manager reports `NotInitialized` until initialized again.
    pub async fn close(&self) {
        let _guard = self.write_lock.lock().await;
        let store = self.store.write().await.take();
        *self.index.write().await = None;
        if let Some(store) = store {
            store.close().await;
            info!("Conversation memory closed");
        }
    }
}
