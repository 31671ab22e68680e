//! Shared test utilities for memory integration tests.
//!
//! Provides MockEmbeddingService, a deterministic EmbeddingService that needs no
//! network, and helpers to open a manager over a temporary directory.

use async_trait::async_trait;
use embedding::EmbeddingService;
use memory::{EnvMemoryConfig, MemoryManager};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::Notify;

pub const DIM: usize = 8;

/// Hashes each lowercase word into one of `dim` buckets, so texts sharing words land
/// close together. Individual texts can be pinned to exact vectors with `pin`.
pub struct MockEmbeddingService {
    dim: AtomicUsize,
    fail: AtomicBool,
    calls: AtomicUsize,
    pinned: Mutex<HashMap<String, Vec<f32>>>,
    held: Mutex<HashMap<String, Arc<Notify>>>,
}

#[allow(dead_code)]
impl MockEmbeddingService {
    pub fn new() -> Self {
        Self {
            dim: AtomicUsize::new(DIM),
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            pinned: Mutex::new(HashMap::new()),
            held: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_dim(&self, dim: usize) {
        self.dim.store(dim, Ordering::SeqCst);
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn pin(&self, text: &str, vector: Vec<f32>) {
        self.pinned.lock().unwrap().insert(text.to_string(), vector);
    }

    /// Embedding `text` blocks until the returned handle is notified.
    pub fn hold(&self, text: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.held.lock().unwrap().insert(text.to_string(), gate.clone());
        gate
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Some(v) = self.pinned.lock().unwrap().get(text) {
            return v.clone();
        }
        let dim = self.dim.load(Ordering::SeqCst);
        let mut vector = vec![0.0; dim];
        for word in text.split_whitespace() {
            let mut hash: u64 = 0xcbf29ce484222325;
            for byte in word.to_lowercase().bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(0x100000001b3);
            }
            vector[(hash % dim as u64) as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingService for MockEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, anyhow::Error> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        Ok(vectors.remove(0))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, anyhow::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gates: Vec<Arc<Notify>> = {
            let held = self.held.lock().unwrap();
            texts.iter().filter_map(|t| held.get(t).cloned()).collect()
        };
        for gate in gates {
            gate.notified().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("mock embedding provider unavailable");
        }
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }
}

/// Manager over `dir` with default settings; not yet initialized.
#[allow(dead_code)]
pub fn manager_in(dir: &TempDir, embedder: Arc<MockEmbeddingService>) -> MemoryManager {
    MemoryManager::new(EnvMemoryConfig::new(dir.path()), embedder)
}

/// Fresh directory, mock provider and an initialized manager.
#[allow(dead_code)]
pub async fn setup() -> (TempDir, Arc<MockEmbeddingService>, MemoryManager) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let embedder = Arc::new(MockEmbeddingService::new());
    let manager = manager_in(&dir, embedder.clone());
    manager.initialize().await.expect("Failed to initialize memory");
    (dir, embedder, manager)
}
