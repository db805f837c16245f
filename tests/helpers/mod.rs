#![allow(dead_code)]

use std::path::Path;

use cairn::db;
use cairn::embedding::{EmbeddingMeta, EmbeddingProvider};
use cairn::error::{Error, Result};
use cairn::notes::federation::VaultSpec;
use cairn::notes::scoring::Profile;
use cairn::notes::search::SearchOptions;
use cairn::notes::store;
use cairn::notes::types::{ChunkDraft, ContentType, NoteDraft};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::Connection;

/// Dimensions of the spike embeddings used throughout the tests.
pub const DIMS: usize = 8;

/// Open a fresh in-memory vault with sqlite-vec registered.
pub fn test_db() -> Connection {
    db::open_memory_database().unwrap()
}

/// Deterministic unit vector with a spike at position `seed`.
/// Distinct seeds are orthogonal.
pub fn spike(seed: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    v[seed % DIMS] = 1.0;
    v
}

pub fn spike_meta() -> EmbeddingMeta {
    EmbeddingMeta::new("test", "spike", DIMS)
}

/// Fixed "now" so recency scores do not drift with the wall clock.
pub fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
}

pub fn options(profile: Profile) -> SearchOptions {
    SearchOptions {
        profile,
        reference_time: Some(reference_time()),
        ..SearchOptions::default()
    }
}

/// Provider that always returns the same vector.
pub struct FixedProvider {
    pub provider: String,
    pub model: String,
    pub dims: usize,
    pub vector: Vec<f32>,
}

impl FixedProvider {
    pub fn spike(seed: usize) -> Self {
        Self {
            provider: "test".into(),
            model: "spike".into(),
            dims: DIMS,
            vector: spike(seed),
        }
    }

    pub fn with_model(provider: &str, model: &str, dims: usize) -> Self {
        let mut vector = vec![0.0f32; dims];
        vector[0] = 1.0;
        Self {
            provider: provider.into(),
            model: model.into(),
            dims,
            vector,
        }
    }
}

impl EmbeddingProvider for FixedProvider {
    fn name(&self) -> &str {
        &self.provider
    }
    fn model(&self) -> &str {
        &self.model
    }
    fn dimensions(&self) -> usize {
        self.dims
    }
    fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(self.vector.clone())
    }
}

/// Provider whose backend is unreachable.
pub struct DownProvider;

impl EmbeddingProvider for DownProvider {
    fn name(&self) -> &str {
        "test"
    }
    fn model(&self) -> &str {
        "spike"
    }
    fn dimensions(&self) -> usize {
        DIMS
    }
    fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::ProviderUnavailable("connection refused".into()))
    }
}

/// Builder for [`NoteDraft`]s with test-friendly defaults.
pub struct NoteBuilder {
    draft: NoteDraft,
}

pub fn note(path: &str) -> NoteBuilder {
    NoteBuilder {
        draft: NoteDraft {
            path: path.into(),
            title: format!("Title of {path}"),
            tags: vec![],
            content_type: ContentType::Note,
            domain: None,
            workstream: None,
            modified: reference_time(),
            content_hash: format!("hash-{path}"),
            confidence: None,
            chunks: vec![],
            embedding_meta: None,
        },
    }
}

impl NoteBuilder {
    /// Add a chunk embedded as `spike(seed)`.
    pub fn chunk(self, text: &str, seed: usize) -> Self {
        self.chunk_with(text, Some(spike(seed)))
    }

    /// Add a chunk with no embedding.
    pub fn lexical_chunk(self, text: &str) -> Self {
        self.chunk_with(text, None)
    }

    pub fn chunk_with(mut self, text: &str, embedding: Option<Vec<f32>>) -> Self {
        let index = self.draft.chunks.len();
        self.draft.chunks.push(ChunkDraft {
            heading: format!("Section {index}"),
            text: text.into(),
            embedding,
        });
        self
    }

    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.draft.content_type = content_type;
        self
    }

    pub fn domain(mut self, domain: &str) -> Self {
        self.draft.domain = Some(domain.into());
        self
    }

    pub fn modified(mut self, modified: DateTime<Utc>) -> Self {
        self.draft.modified = modified;
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.draft.confidence = Some(confidence);
        self
    }

    pub fn hash(mut self, hash: &str) -> Self {
        self.draft.content_hash = hash.into();
        self
    }

    pub fn embedding_meta(mut self, meta: EmbeddingMeta) -> Self {
        self.draft.embedding_meta = Some(meta);
        self
    }

    /// Finish the draft; embedded chunks default to the spike triple.
    pub fn build(mut self) -> NoteDraft {
        let embeds = self.draft.chunks.iter().any(|c| c.embedding.is_some());
        if embeds && self.draft.embedding_meta.is_none() {
            self.draft.embedding_meta = Some(spike_meta());
        }
        self.draft
    }
}

pub fn index(conn: &mut Connection, drafts: &[NoteDraft]) {
    for draft in drafts {
        store::upsert_note(conn, draft, false).unwrap();
    }
}

/// Create an on-disk vault under `dir` holding `drafts`.
pub fn make_vault(dir: &Path, name: &str, drafts: &[NoteDraft]) -> VaultSpec {
    let path = dir.join(format!("{name}.db"));
    let mut conn = db::open_database(&path).unwrap();
    index(&mut conn, drafts);
    drop(conn);
    VaultSpec::new(name, path)
}

/// A vault file that is not a SQLite database at all.
pub fn corrupt_vault(dir: &Path, name: &str) -> VaultSpec {
    let path = dir.join(format!("{name}.db"));
    std::fs::write(&path, vec![0xA5u8; 4096]).unwrap();
    VaultSpec::new(name, path)
}
