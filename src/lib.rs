//! Hybrid retrieval and ranking over an AI assistant's note vaults.
//!
//! Cairn keeps a project's notes, decisions, and session handoffs as chunk rows
//! in a per-vault SQLite index and turns a query into a short, ranked,
//! deduplicated list of notes. Retrieval is tiered:
//!
//! | Tier | Source | Score |
//! |------|--------|-------|
//! | **Vector** | sqlite-vec k-NN over chunk embeddings | composite of similarity, recency, confidence, content type |
//! | **Full-text** | FTS5 BM25 | fixed 0.5 |
//! | **Keyword** | substring match on query terms | fixed 0.4 |
//!
//! Lexical tiers only run when the vault has no vectors, the embedding
//! backend is down, or the vector tier finds nothing; results then carry
//! `degraded = true`. Federation runs the same search across several vaults
//! concurrently and merges the tagged results.
//!
//! # Modules
//!
//! - [`config`]: TOML config plus environment overrides
//! - [`db`]: vault handles, schema, embedding metadata, health checks
//! - [`embedding`]: the query embedding provider seam and an Ollama client
//! - [`error`]: the error type returned by retrieval and feedback
//! - [`notes`]: index maintenance, search, federation, feedback, pinning, reports

pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod notes;

pub use error::{Error, Result};
