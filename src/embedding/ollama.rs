//! Ollama-compatible HTTP embedding provider.
//!
//! Posts `{"model", "prompt"}` to `{base_url}/api/embeddings` with a blocking
//! `reqwest` client. Connection, timeout, HTTP, and decode failures all map to
//! [`Error::ProviderUnavailable`] so search can fall back to lexical tiers.

use std::time::Duration;

use anyhow::Context;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::EmbeddingProvider;
use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Blocking client for an Ollama embeddings endpoint.
pub struct OllamaProvider {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: usize,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        anyhow::ensure!(!config.model.trim().is_empty(), "missing embedding model name");
        anyhow::ensure!(config.dimensions > 0, "embedding dimensions must be positive");

        let timeout = Duration::from_millis(config.timeout_ms);
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .context("failed to build embedding HTTP client")?;
        let endpoint = format!("{}/api/embeddings", config.base_url.trim_end_matches('/'));

        tracing::debug!(endpoint = %endpoint, model = %config.model, "embedding provider configured");

        Ok(Self {
            client,
            endpoint,
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }
}

impl EmbeddingProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .map_err(|e| Error::ProviderUnavailable(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::ProviderUnavailable(format!(
                "{} returned HTTP {status}",
                self.endpoint
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .map_err(|e| Error::ProviderUnavailable(format!("malformed embedding response: {e}")))?;

        if body.embedding.is_empty() {
            return Err(Error::ProviderUnavailable("provider returned an empty embedding".into()));
        }
        Ok(body.embedding)
    }
}
