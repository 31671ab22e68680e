//! Turn record model for persistence.
//!
//! Maps to the `conversation_turns` table and is returned by TurnRepository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stored turn. `agent_response` is the JSON text written at insert time and
/// `embedding` the little-endian `f32` bytes of the input's embedding.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TurnRecord {
    pub id: i64,
    pub session_id: String,
    pub user_input: String,
    pub agent_response: String,
    pub embedding: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// Id and raw embedding bytes; what an index rebuild needs and nothing more.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EmbeddingRow {
    pub id: i64,
    pub embedding: Vec<u8>,
}
