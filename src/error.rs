//! Error taxonomy for the retrieval core.
//!
//! Search, federation, feedback, and index maintenance return [`Result`] over
//! [`Error`]. Infrastructure (database open, config load, the CLI) keeps using
//! `anyhow` and converts at the boundary.

use thiserror::Error;

use crate::embedding::EmbeddingMeta;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The embedding backend could not be reached, timed out, or returned garbage.
    /// Search recovers from this by switching to a lexical tier.
    #[error("embedding provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The vault's vectors were produced under a different (provider, model, dims)
    /// triple than the query vector. Never recovered.
    #[error("embedding mismatch: vault indexed with {stored}, query uses {active}; reindex the vault")]
    EmbeddingMismatch {
        stored: EmbeddingMeta,
        active: EmbeddingMeta,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid feedback direction: {0:?} (expected \"up\" or \"down\")")]
    InvalidDirection(String),

    /// Every vault in a federated search failed. Carries the per-vault warnings.
    #[error("no usable vaults: {}", .0.join("; "))]
    NoUsableVaults(Vec<String>),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_message_names_both_triples() {
        let err = Error::EmbeddingMismatch {
            stored: EmbeddingMeta::new("ollama", "nomic-embed-text", 768),
            active: EmbeddingMeta::new("ollama", "mxbai-embed-large", 1024),
        };
        let msg = err.to_string();
        assert!(msg.contains("nomic-embed-text"));
        assert!(msg.contains("1024"));
    }

    #[test]
    fn no_usable_vaults_joins_warnings() {
        let err = Error::NoUsableVaults(vec!["a: corrupt".into(), "b: timeout".into()]);
        assert_eq!(err.to_string(), "no usable vaults: a: corrupt; b: timeout");
    }
}
