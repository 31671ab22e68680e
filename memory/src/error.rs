//! Memory error types.

use storage::StorageError;
use thiserror::Error;

/// Errors raised by the vector index.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("vector width {actual} does not match index dimension {expected}")]
    Dimension { expected: usize, actual: usize },
    #[error("id {0} is already indexed")]
    DuplicateId(i64),
    #[error("index file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("index file codec error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("index file is corrupt: {0}")]
    Corrupt(String),
}

/// Errors surfaced by [`MemoryManager`](crate::MemoryManager).
#[derive(Error, Debug)]
pub enum MemoryError {
    /// A method was called before `initialize()` completed (or after `close()`).
    #[error("memory manager is not initialized")]
    NotInitialized,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Propagated unchanged from the embedding provider.
    #[error("Embedding provider error: {0}")]
    EmbeddingProvider(anyhow::Error),

    /// The provider returned a vector whose width differs from the established one.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector index error: {0}")]
    Index(IndexError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<IndexError> for MemoryError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::Dimension { expected, actual } => {
                MemoryError::DimensionMismatch { expected, actual }
            }
            other => MemoryError::Index(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, MemoryError>;
