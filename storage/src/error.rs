//! Storage error types.
//!
//! Used by the turn repository and callers of storage APIs.

use thiserror::Error;

/// Errors that can occur when using storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Decode error: {0}")]
    Decode(String),
}
