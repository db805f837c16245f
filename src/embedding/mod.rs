//! Query embedding providers.
//!
//! The retrieval core consumes an [`EmbeddingProvider`] but never manages its
//! configuration or lifecycle. Every vector is tagged with the [`EmbeddingMeta`]
//! triple it was produced under so search can refuse to compare vectors from
//! different models.

pub mod ollama;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The (provider, model, dimensions) triple that produced a set of vectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingMeta {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
}

impl EmbeddingMeta {
    pub fn new(provider: impl Into<String>, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            dimensions,
        }
    }
}

impl std::fmt::Display for EmbeddingMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} ({} dims)", self.provider, self.model, self.dimensions)
    }
}

/// Trait for turning query text into a vector.
///
/// Calls are blocking and may go over the network; implementations must bound
/// them with a short timeout and report any failure as
/// [`Error::ProviderUnavailable`](crate::error::Error::ProviderUnavailable).
/// Callers in async contexts should use `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Provider identifier, e.g. `"ollama"`.
    fn name(&self) -> &str;

    /// Model identifier, e.g. `"nomic-embed-text"`.
    fn model(&self) -> &str;

    /// Number of dimensions this provider claims to produce.
    fn dimensions(&self) -> usize;

    /// Embed a single query string.
    fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// The triple this provider would record for the vectors it produces.
    fn meta(&self) -> EmbeddingMeta {
        EmbeddingMeta::new(self.name(), self.model(), self.dimensions())
    }
}

/// Create an embedding provider from config.
///
/// `"ollama"` talks to an Ollama-compatible HTTP endpoint; `"none"` disables
/// vector search entirely, so every query runs in degraded (lexical) mode.
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> anyhow::Result<Option<Box<dyn EmbeddingProvider>>> {
    match config.provider.as_str() {
        "ollama" => {
            let provider = ollama::OllamaProvider::new(config)?;
            Ok(Some(Box::new(provider)))
        }
        "none" => Ok(None),
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: ollama, none"),
    }
}
