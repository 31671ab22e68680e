//! Row models for the `conversation_turns` table.

mod embedding_bytes;
mod session_summary;
mod turn_record;

pub use embedding_bytes::{decode_embedding, encode_embedding};
pub use session_summary::SessionSummary;
pub use turn_record::{EmbeddingRow, TurnRecord};
