//! Memory configuration: trait and env-based implementation.

use anyhow::Result;
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_MEMORY_DIR: &str = "./agent_workspace/memory";
pub const DEFAULT_DB_FILE: &str = "memory.db";
pub const DEFAULT_INDEX_FILE: &str = "faiss.index";
pub const DEFAULT_RECENT_LIMIT: usize = 5;
pub const DEFAULT_TOP_K: usize = 3;

/// Storage layout and retrieval defaults for the conversation memory.
pub trait MemoryConfig: Send + Sync {
    /// Working directory holding the database and index files.
    fn memory_dir(&self) -> &Path;
    fn db_file(&self) -> &str;
    fn index_file(&self) -> &str;
    /// Default short-term window size.
    fn recent_limit(&self) -> usize;
    /// Default number of cross-session turns to recall.
    fn relevant_top_k(&self) -> usize;
    /// Keep widening the candidate search until `top_k` cross-session turns are
    /// found or the index is exhausted, instead of a single 2x over-fetch.
    fn exhaustive_recall(&self) -> bool;

    fn db_path(&self) -> PathBuf {
        self.memory_dir().join(self.db_file())
    }
    fn index_path(&self) -> PathBuf {
        self.memory_dir().join(self.index_file())
    }
}

/// Memory config loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EnvMemoryConfig {
    pub memory_dir: PathBuf,
    pub memory_db_file: String,
    pub memory_index_file: String,
    pub memory_recent_limit: usize,
    pub memory_relevant_top_k: usize,
    pub memory_exhaustive_recall: bool,
}

impl MemoryConfig for EnvMemoryConfig {
    fn memory_dir(&self) -> &Path {
        &self.memory_dir
    }
    fn db_file(&self) -> &str {
        &self.memory_db_file
    }
    fn index_file(&self) -> &str {
        &self.memory_index_file
    }
    fn recent_limit(&self) -> usize {
        self.memory_recent_limit
    }
    fn relevant_top_k(&self) -> usize {
        self.memory_relevant_top_k
    }
    fn exhaustive_recall(&self) -> bool {
        self.memory_exhaustive_recall
    }
}

impl EnvMemoryConfig {
    /// Defaults rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            memory_dir: dir.into(),
            memory_db_file: DEFAULT_DB_FILE.to_string(),
            memory_index_file: DEFAULT_INDEX_FILE.to_string(),
            memory_recent_limit: DEFAULT_RECENT_LIMIT,
            memory_relevant_top_k: DEFAULT_TOP_K,
            memory_exhaustive_recall: false,
        }
    }

    /// Load from environment variables.
    pub fn from_env() -> Result<Self> {
        let memory_dir = env::var("MEMORY_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MEMORY_DIR.to_string());
        let memory_db_file =
            env::var("MEMORY_DB_FILE").unwrap_or_else(|_| DEFAULT_DB_FILE.to_string());
        let memory_index_file =
            env::var("MEMORY_INDEX_FILE").unwrap_or_else(|_| DEFAULT_INDEX_FILE.to_string());
        let memory_recent_limit = env::var("MEMORY_RECENT_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RECENT_LIMIT);
        let memory_relevant_top_k = env::var("MEMORY_RELEVANT_TOP_K")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TOP_K);
        let memory_exhaustive_recall = env::var("MEMORY_EXHAUSTIVE_RECALL")
            .ok()
            .and_then(|s| match s.to_lowercase().as_str() {
                "1" | "true" | "yes" => Some(true),
                _ => s.parse().ok(),
            })
            .unwrap_or(false);

        Ok(Self {
            memory_dir: PathBuf::from(memory_dir),
            memory_db_file,
            memory_index_file,
            memory_recent_limit,
            memory_relevant_top_k,
            memory_exhaustive_recall,
        })
    }

    /// Validate config: the two files must be distinct plain file names.
    pub fn validate(&self) -> Result<()> {
        for name in [&self.memory_db_file, &self.memory_index_file] {
            if name.trim().is_empty() || name.contains('/') || name.contains('\\') {
                anyhow::bail!("memory file name must be a plain file name, got {:?}", name);
            }
        }
        if self.memory_db_file == self.memory_index_file {
            anyhow::bail!("MEMORY_DB_FILE and MEMORY_INDEX_FILE must differ");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "MEMORY_DIR",
            "MEMORY_DB_FILE",
            "MEMORY_INDEX_FILE",
            "MEMORY_RECENT_LIMIT",
            "MEMORY_RELEVANT_TOP_K",
            "MEMORY_EXHAUSTIVE_RECALL",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        let config = EnvMemoryConfig::from_env().unwrap();

        assert_eq!(config.memory_dir(), Path::new(DEFAULT_MEMORY_DIR));
        assert_eq!(config.db_path(), Path::new(DEFAULT_MEMORY_DIR).join("memory.db"));
        assert_eq!(config.index_path(), Path::new(DEFAULT_MEMORY_DIR).join("faiss.index"));
        assert_eq!(config.recent_limit(), 5);
        assert_eq!(config.relevant_top_k(), 3);
        assert!(!config.exhaustive_recall());
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        env::set_var("MEMORY_DIR", "/tmp/turns");
        env::set_var("MEMORY_RECENT_LIMIT", "8");
        env::set_var("MEMORY_RELEVANT_TOP_K", "not-a-number");
        env::set_var("MEMORY_EXHAUSTIVE_RECALL", "yes");

        let config = EnvMemoryConfig::from_env().unwrap();
        assert_eq!(config.memory_dir(), Path::new("/tmp/turns"));
        assert_eq!(config.recent_limit(), 8);
        assert_eq!(config.relevant_top_k(), DEFAULT_TOP_K);
        assert!(config.exhaustive_recall());

        clear_env();
    }

    #[test]
    fn test_validate_rejects_bad_file_names() {
        let mut config = EnvMemoryConfig::new("/tmp/turns");
        config.memory_index_file = "memory.db".to_string();
        assert!(config.validate().is_err());

        let mut config = EnvMemoryConfig::new("/tmp/turns");
        config.memory_db_file = "../memory.db".to_string();
        assert!(config.validate().is_err());
    }
}
