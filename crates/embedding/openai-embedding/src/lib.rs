//! # OpenAI Embedding Service
//!
//! [`EmbeddingService`] backed by the OpenAI embeddings API (or any OpenAI-compatible
//! endpoint via a base URL). This is the provider the memory CLI wires in; library
//! callers are free to supply their own.
//!
//! ## Example
//!
//! ```rust,no_run
//! use embedding::EmbeddingService;
//! use openai_embedding::OpenAIEmbedding;
//!
//! async fn example() -> Result<(), anyhow::Error> {
//!     let service = OpenAIEmbedding::new("sk-...".to_string(), "text-embedding-3-small".to_string());
//!     let vector = service.embed("heap space failure").await?;
//!     println!("dimension: {}", vector.len());
//!     Ok(())
//! }
//! ```
//!
//! Every request carries its own timeout so a stalled endpoint surfaces as an error
//! instead of hanging a memory write.

use async_openai::{config::OpenAIConfig, types::CreateEmbeddingRequestArgs, Client};
use async_trait::async_trait;
use embedding::{EmbeddingConfig, EmbeddingService};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const DEFAULT_MODEL: &str = "text-embedding-3-small";
const EMBED_TIMEOUT: Duration = Duration::from_secs(30);
const EMBED_BATCH_TIMEOUT: Duration = Duration::from_secs(60);
const LOG_PREVIEW_LEN: usize = 200;

/// OpenAI embedding service. Holds the async-openai client and model name.
#[derive(Debug, Clone)]
pub struct OpenAIEmbedding {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIEmbedding {
    /// Creates a service for `model`. An empty `api_key` falls back to OPENAI_API_KEY.
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_base_url(api_key, model, None)
    }

    /// Creates a service that sends requests to `base_url` when it is set and non-empty.
    pub fn new_with_base_url(api_key: String, model: String, base_url: Option<&str>) -> Self {
        let api_key = if api_key.is_empty() {
            std::env::var("OPENAI_API_KEY").unwrap_or_default()
        } else {
            api_key
        };

        let mut openai_config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(url) = base_url.filter(|s| !s.is_empty()) {
            openai_config = openai_config.with_api_base(url);
        }

        Self {
            client: Client::with_config(openai_config),
            model,
        }
    }

    /// Creates a service with the default model.
    pub fn with_api_key(api_key: String) -> Self {
        Self::new(api_key, DEFAULT_MODEL.to_string())
    }

    /// Builds a service from an [`EmbeddingConfig`] (model, key, optional base URL).
    pub fn from_config(config: &dyn EmbeddingConfig) -> Self {
        Self::new_with_base_url(
            config.openai_api_key().to_string(),
            config.model().to_string(),
            config.openai_base_url(),
        )
    }

    /// Returns the embedding model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn request(&self, inputs: Vec<&str>, timeout: Duration) -> Result<Vec<Vec<f32>>, anyhow::Error> {
        let expected = inputs.len();
        let request = CreateEmbeddingRequestArgs::default()
            .model(self.model.clone())
            .input(inputs)
            .build()?;

        let embeddings = self.client.embeddings();
        let response = match tokio::time::timeout(timeout, embeddings.create(request)).await {
            Ok(Ok(r)) => {
                debug!("OpenAI embed response received");
                r
            }
            Ok(Err(e)) => {
                warn!(error = %e, "OpenAI embed request failed");
                return Err(e.into());
            }
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs(), "OpenAI embed request timed out");
                anyhow::bail!(
                    "OpenAI embed request timed out after {} seconds",
                    timeout.as_secs()
                );
            }
        };

        let mut data = response.data;
        data.sort_by_key(|item| item.index);
        let vectors: Vec<Vec<f32>> = data.into_iter().map(|item| item.embedding).collect();

        if vectors.len() != expected {
            warn!(expected, got = vectors.len(), "OpenAI embed response count mismatch");
            anyhow::bail!("Expected {} embeddings, got {}", expected, vectors.len());
        }
        if let Some(first) = vectors.first() {
            if vectors.iter().any(|v| v.len() != first.len()) {
                anyhow::bail!("OpenAI embed response mixes vector widths");
            }
        }
        Ok(vectors)
    }
}

/// Truncates `text` to at most `max_chars` characters for log output.
fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[async_trait]
impl EmbeddingService for OpenAIEmbedding {
    #[instrument(skip(self, text), fields(model = %self.model, text_len = text.len()))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>, anyhow::Error> {
        info!(text_preview = %preview(text, LOG_PREVIEW_LEN), "embedding request");
        let mut vectors = self.request(vec![text], EMBED_TIMEOUT).await?;
        let embedding = vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("No embedding in response"))?;
        info!(dimension = embedding.len(), "embedding done");
        Ok(embedding)
    }

    #[instrument(skip(self, texts), fields(model = %self.model, batch_size = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, anyhow::Error> {
        if texts.is_empty() {
            debug!("OpenAI embed_batch empty input, skipping");
            return Ok(vec![]);
        }
        let timeout = if texts.len() == 1 { EMBED_TIMEOUT } else { EMBED_BATCH_TIMEOUT };
        let inputs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
        let vectors = self.request(inputs, timeout).await?;
        info!(
            count = vectors.len(),
            dimension = vectors.first().map(|v| v.len()).unwrap_or(0),
            "embedding batch done"
        );
        Ok(vectors)
    }
}
