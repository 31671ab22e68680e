//! Subcommand handlers. Each returns the JSON document the binary prints.

use anyhow::{Context, Result};
use memory::{MemoryConfig, MemoryManager};
use serde_json::{json, Value};
use tracing::info;

use crate::cli::Commands;

/// Runs one subcommand against an initialized manager.
pub async fn execute(manager: &MemoryManager, command: Commands) -> Result<Value> {
    match command {
        Commands::Add {
            session,
            input,
            response,
        } => {
            if !response.is_object() {
                anyhow::bail!("--response must be a JSON object");
            }
            let id = manager
                .add_turn(&session, &input, &response)
                .await
                .context("Store turn")?;
            info!(?id, session = %session, "Turn added");
            Ok(json!({ "id": id }))
        }
        Commands::History { session, limit } => {
            let limit = limit.unwrap_or_else(|| manager.config().recent_limit());
            let turns = manager.get_short_term_history(&session, limit).await?;
            Ok(serde_json::to_value(turns)?)
        }
        Commands::Recall {
            session,
            query,
            top_k,
        } => {
            let top_k = top_k.unwrap_or_else(|| manager.config().relevant_top_k());
            let turns = manager
                .retrieve_relevant_turns(&query, &session, top_k)
                .await?;
            Ok(serde_json::to_value(turns)?)
        }
        Commands::Sessions => Ok(serde_json::to_value(manager.list_sessions().await?)?),
        Commands::Rebuild => Ok(serde_json::to_value(manager.rebuild_index().await?)?),
        Commands::Stats => Ok(serde_json::to_value(manager.stats().await?)?),
    }
}
