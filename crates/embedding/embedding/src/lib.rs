//! # Text Embeddings
//!
//! Defines the embedding service the conversation memory consumes. The memory never
//! picks a model itself: whatever implements [`EmbeddingService`] decides how text
//! becomes a vector, and the width of the first vector it returns is treated as fixed.

use async_trait::async_trait;
use std::sync::Arc;

mod config;
pub use config::{EmbeddingConfig, EnvEmbeddingConfig};

/// Service for generating text embeddings.
///
/// Implementations must return one vector per input, in input order, and every vector
/// returned over the lifetime of a service must have the same width.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Generates an embedding vector for a single text string.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, anyhow::Error>;

    /// Generates embedding vectors for multiple texts in a single call.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, anyhow::Error>;
}

#[async_trait]
impl<T: EmbeddingService + ?Sized> EmbeddingService for Arc<T> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, anyhow::Error> {
        (**self).embed(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, anyhow::Error> {
        (**self).embed_batch(texts).await
    }
}

/// Embeds exactly one text through [`EmbeddingService::embed_batch`] and checks the
/// provider honoured the one-in, one-out contract.
pub async fn embed_single<S>(service: &S, text: &str) -> Result<Vec<f32>, anyhow::Error>
where
    S: EmbeddingService + ?Sized,
{
    let mut vectors = service.embed_batch(&[text.to_string()]).await?;
    if vectors.len() != 1 {
        anyhow::bail!(
            "embedding provider returned {} vectors for a single input",
            vectors.len()
        );
    }
    Ok(vectors.remove(0))
}
