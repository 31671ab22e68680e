//! Subcommand handlers against a temporary memory directory.

use async_trait::async_trait;
use embedding::EmbeddingService;
use memory::{EnvMemoryConfig, MemoryManager};
use memory_cli::{execute, Commands};
use serde_json::json;
use std::sync::Arc;

/// Three-wide vectors from text length and the first two bytes; enough to tell inputs apart.
struct FixedEmbedding;

#[async_trait]
impl EmbeddingService for FixedEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, anyhow::Error> {
        let bytes = text.as_bytes();
        Ok(vec![
            text.len() as f32,
            bytes.first().copied().unwrap_or(0) as f32,
            bytes.get(1).copied().unwrap_or(0) as f32,
        ])
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, anyhow::Error> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

async fn manager(dir: &tempfile::TempDir) -> MemoryManager {
    let manager = MemoryManager::new(EnvMemoryConfig::new(dir.path()), Arc::new(FixedEmbedding));
    manager.initialize().await.unwrap();
    manager
}

fn add(session: &str, input: &str) -> Commands {
    Commands::Add {
        session: session.to_string(),
        input: input.to_string(),
        response: json!({ "echo": input }),
    }
}

/// **Test: add, history, recall, sessions and stats print the expected documents.**
#[tokio::test]
async fn test_add_history_recall_stats() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&dir).await;

    let added = execute(&manager, add("a", "heap error")).await.unwrap();
    assert!(added["id"].is_i64());
    execute(&manager, add("b", "heap space failure")).await.unwrap();

    let history = execute(
        &manager,
        Commands::History {
            session: "a".to_string(),
            limit: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["agent_response"]["echo"], "heap error");

    let recall = execute(
        &manager,
        Commands::Recall {
            session: "a".to_string(),
            query: "heap issue".to_string(),
            top_k: Some(1),
        },
    )
    .await
    .unwrap();
    assert_eq!(recall[0]["session_id"], "b");

    let sessions = execute(&manager, Commands::Sessions).await.unwrap();
    assert_eq!(sessions[0]["session_id"], "b");
    assert_eq!(sessions[1]["session_id"], "a");
    assert_eq!(sessions[1]["turns"], 1);

    let stats = execute(&manager, Commands::Stats).await.unwrap();
    assert_eq!(stats, json!({ "turns": 2, "indexed": 2, "embedding_dim": 3 }));

    let rebuilt = execute(&manager, Commands::Rebuild).await.unwrap();
    assert_eq!(rebuilt, stats);
}

/// **Test: a non-object response is refused before touching the memory.**
#[tokio::test]
async fn test_add_rejects_non_object() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&dir).await;

    let command = Commands::Add {
        session: "a".to_string(),
        input: "x".to_string(),
        response: json!(["not", "an", "object"]),
    };
    assert!(execute(&manager, command).await.is_err());
    assert_eq!(manager.stats().await.unwrap().turns, 0);
}
