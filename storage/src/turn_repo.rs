//! Turn repository: persistence and queries for conversation turns.
//!
//! Uses SqlitePoolManager and the models (TurnRecord, EmbeddingRow).
//! Rows are append-only; ids come from SQLite's AUTOINCREMENT and are never reused,
//! so they double as insertion order and as vector index keys.

use crate::error::StorageError;
use crate::models::{EmbeddingRow, SessionSummary, TurnRecord};
use crate::sqlite_pool::SqlitePoolManager;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};
use std::path::Path;
use tracing::{debug, info};

/// Stay well below SQLite's bound-parameter limit for `IN (...)` lookups.
const ID_CHUNK: usize = 500;

const TURN_COLUMNS: &str = "id, session_id, user_input, agent_response, embedding, created_at";

#[derive(Clone)]
pub struct TurnRepository {
    pool_manager: SqlitePoolManager,
}

impl TurnRepository {
    /// Opens (creating if needed) the database file. Call [`init`](Self::init) before use.
    pub async fn open(path: &Path) -> Result<Self, StorageError> {
        let pool_manager = SqlitePoolManager::new(path).await?;
        Ok(Self { pool_manager })
    }

    /// Creates the turns table and its session index if absent. Safe on every start.
    pub async fn init(&self) -> Result<(), StorageError> {
        info!("Creating conversation_turns table if not exist");

        let pool = self.pool_manager.pool();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversation_turns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                user_input TEXT NOT NULL,
                agent_response TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_conversation_turns_session ON conversation_turns(session_id, id)",
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Appends one row and returns its generated id.
    pub async fn insert(
        &self,
        session_id: &str,
        user_input: &str,
        serialized_response: &str,
        embedding_bytes: &[u8],
    ) -> Result<i64, StorageError> {
        let pool = self.pool_manager.pool();

        let result = sqlx::query(
            r#"
            INSERT INTO conversation_turns (session_id, user_input, agent_response, embedding, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(session_id)
        .bind(user_input)
        .bind(serialized_response)
        .bind(embedding_bytes)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!(id, session_id, "Saved conversation turn");
        Ok(id)
    }

    /// Returns up to `limit` most recent turns of a session, newest first.
    pub async fn select_recent_by_session(
        &self,
        session_id: &str,
        limit: i64,
    ) -> Result<Vec<TurnRecord>, StorageError> {
        let pool = self.pool_manager.pool();
        let sql = format!(
            "SELECT {} FROM conversation_turns WHERE session_id = ? ORDER BY id DESC LIMIT ?",
            TURN_COLUMNS
        );

        let turns = sqlx::query_as::<_, TurnRecord>(&sql)
            .bind(session_id)
            .bind(limit)
            .fetch_all(pool)
            .await?;

        debug!(session_id, count = turns.len(), "Retrieved recent turns");
        Ok(turns)
    }

    /// Resolves ids to rows. Unknown ids are skipped; result order is unspecified.
    pub async fn select_by_ids(&self, ids: &[i64]) -> Result<Vec<TurnRecord>, StorageError> {
        let pool = self.pool_manager.pool();
        let mut turns = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(ID_CHUNK) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
                "SELECT {} FROM conversation_turns WHERE id IN (",
                TURN_COLUMNS
            ));
            let mut separated = builder.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            separated.push_unseparated(")");

            let rows = builder.build_query_as::<TurnRecord>().fetch_all(pool).await?;
            turns.extend(rows);
        }

        Ok(turns)
    }

    /// Full scan of `(id, embedding)` pairs in id order, for index rebuilds.
    pub async fn select_all_embeddings(&self) -> Result<Vec<EmbeddingRow>, StorageError> {
        let pool = self.pool_manager.pool();

        let rows = sqlx::query_as::<_, EmbeddingRow>(
            "SELECT id, embedding FROM conversation_turns ORDER BY id",
        )
        .fetch_all(pool)
        .await?;

        info!(count = rows.len(), "Loaded all stored embeddings");
        Ok(rows)
    }

    /// Number of stored turns.
    pub async fn count(&self) -> Result<i64, StorageError> {
        let pool = self.pool_manager.pool();
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM conversation_turns")
            .fetch_one(pool)
            .await?;
        Ok(total.0)
    }

    /// Highest stored id, `None` on an empty table.
    pub async fn max_id(&self) -> Result<Option<i64>, StorageError> {
        let pool = self.pool_manager.pool();
        let max: (Option<i64>,) = sqlx::query_as("SELECT MAX(id) FROM conversation_turns")
            .fetch_one(pool)
            .await?;
        Ok(max.0)
    }

    /// Every session with its turn count, most recently active first.
    pub async fn select_sessions(&self) -> Result<Vec<SessionSummary>, StorageError> {
        let pool = self.pool_manager.pool();

        let sessions = sqlx::query_as::<_, SessionSummary>(
            r#"
            SELECT session_id, COUNT(*) AS turns, MAX(id) AS last_turn_id
            FROM conversation_turns
            GROUP BY session_id
            ORDER BY MAX(id) DESC
            "#,
        )
        .fetch_all(pool)
        .await?;

        debug!(count = sessions.len(), "Listed sessions");
        Ok(sessions)
    }

    /// Releases the pool's connections.
    pub async fn close(&self) {
        self.pool_manager.close().await;
    }
}
