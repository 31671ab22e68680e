//! CLI parser and config loading.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use memory::EnvMemoryConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "turn-memory")]
#[command(about = "Inspect and feed the conversation memory", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Memory directory (overrides MEMORY_DIR).
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    /// Also append logs to this file.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Store one turn. The response must be a JSON object.
    Add {
        #[arg(short, long)]
        session: String,
        #[arg(short, long)]
        input: String,
        #[arg(short, long, value_parser = parse_json)]
        response: serde_json::Value,
    },
    /// Most recent turns of a session, oldest first.
    History {
        #[arg(short, long)]
        session: String,
        /// Defaults to MEMORY_RECENT_LIMIT.
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Turns from other sessions closest to a query.
    Recall {
        #[arg(short, long)]
        session: String,
        #[arg(short, long)]
        query: String,
        /// Defaults to MEMORY_RELEVANT_TOP_K.
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Stored sessions, most recently active first.
    Sessions,
    /// Rebuild the vector index from the database.
    Rebuild,
    /// Row count, index size and embedding width.
    Stats,
}

fn parse_json(raw: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {}", e))
}

/// Load memory config from environment; `--dir` overrides MEMORY_DIR.
pub fn load_config(dir: Option<PathBuf>) -> Result<EnvMemoryConfig> {
    let mut config = EnvMemoryConfig::from_env().context("Load memory config from environment")?;
    if let Some(dir) = dir {
        config.memory_dir = dir;
    }
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add() {
        let cli = Cli::try_parse_from([
            "turn-memory",
            "--dir",
            "/tmp/mem",
            "add",
            "--session",
            "run-1",
            "--input",
            "heap error",
            "--response",
            r#"{"summary":"OOM"}"#,
        ])
        .unwrap();

        assert_eq!(cli.dir, Some(PathBuf::from("/tmp/mem")));
        assert_eq!(
            cli.command,
            Commands::Add {
                session: "run-1".to_string(),
                input: "heap error".to_string(),
                response: serde_json::json!({"summary": "OOM"}),
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_json() {
        let result = Cli::try_parse_from([
            "turn-memory", "add", "-s", "run-1", "-i", "x", "-r", "{oops",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_recall_defaults() {
        let cli = Cli::try_parse_from(["turn-memory", "recall", "-s", "a", "-q", "build failed"])
            .unwrap();
        assert_eq!(
            cli.command,
            Commands::Recall {
                session: "a".to_string(),
                query: "build failed".to_string(),
                top_k: None,
            }
        );

        let cli = Cli::try_parse_from(["turn-memory", "history", "-s", "a", "-l", "2", "--log-file", "m.log"])
            .unwrap();
        assert_eq!(cli.log_file, Some(PathBuf::from("m.log")));
        assert_eq!(
            cli.command,
            Commands::History {
                session: "a".to_string(),
                limit: Some(2),
            }
        );

        let cli = Cli::try_parse_from(["turn-memory", "sessions"]).unwrap();
        assert_eq!(cli.command, Commands::Sessions);
    }
}
