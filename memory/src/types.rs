//! Core types returned by the memory manager.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
pub use storage::SessionSummary;
use storage::{decode_embedding, StorageError, TurnRecord};

/// One user input and the agent's response to it.
///
/// Created once by `add_turn` and never modified afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    /// Row id; insertion order and vector index key.
    pub id: i64,
    /// Session (run or conversation) the turn belongs to.
    pub session_id: String,
    /// Verbatim user message or log content.
    pub user_input: String,
    /// Whatever the agent produced, as a schema-free JSON object.
    pub agent_response: Map<String, Value>,
    /// Embedding of `user_input` computed at write time.
    pub embedding: Vec<f32>,
    pub timestamp: DateTime<Utc>,
}

impl TryFrom<TurnRecord> for ConversationTurn {
    type Error = StorageError;

    fn try_from(record: TurnRecord) -> Result<Self, Self::Error> {
        let agent_response = match serde_json::from_str::<Value>(&record.agent_response) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return Err(StorageError::Decode(format!(
                    "turn {} response is not a JSON object",
                    record.id
                )))
            }
            Err(e) => {
                return Err(StorageError::Decode(format!(
                    "turn {} response is not valid JSON: {}",
                    record.id, e
                )))
            }
        };

        Ok(Self {
            id: record.id,
            session_id: record.session_id,
            user_input: record.user_input,
            agent_response,
            embedding: decode_embedding(&record.embedding)?,
            timestamp: record.created_at,
        })
    }
}

/// Snapshot of the memory's size, for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryStats {
    /// Rows in the turns table.
    pub turns: i64,
    /// Entries in the vector index.
    pub indexed: usize,
    pub embedding_dim: usize,
}

/// Reduces a response to the JSON object text that gets stored, or `None` when it
/// cannot be serialized or is not map-shaped.
pub(crate) fn to_document<R>(response: &R) -> Option<String>
where
    R: Serialize + ?Sized,
{
    match serde_json::to_value(response) {
        Ok(Value::Object(map)) => serde_json::to_string(&map).ok(),
        _ => None,
    }
}
