//! Per-session aggregate returned by `TurnRepository::select_sessions`.

use serde::{Deserialize, Serialize};

/// One stored session: how many turns it holds and its newest turn id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SessionSummary {
    pub session_id: String,
    pub turns: i64,
    pub last_turn_id: i64,
}
