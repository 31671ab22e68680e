//! turn-memory: add turns, print history and recall results, rebuild the index.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use embedding::EnvEmbeddingConfig;
use memory::MemoryManager;
use memory_cli::{execute, init_tracing, load_config, Cli};
use openai_embedding::OpenAIEmbedding;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref())?;

    let config = load_config(cli.dir)?;
    let embedding_config = EnvEmbeddingConfig::from_env()?;
    embedding_config
        .validate()
        .context("Load embedding config from .env (OPENAI_API_KEY, EMBEDDING_MODEL)")?;
    let embedder = Arc::new(OpenAIEmbedding::from_config(&embedding_config));

    let manager = MemoryManager::new(config, embedder);
    manager.initialize().await.context("Initialize memory")?;

    let result = execute(&manager, cli.command).await;
    manager.close().await;

    println!("{}", serde_json::to_string_pretty(&result?)?);
    Ok(())
}
