//! Core note and result types.
//!
//! [`NoteDraft`] is what an indexer hands the store, [`NoteChunk`] is a stored
//! row, and [`SearchResult`] / [`FederatedSearchResult`] are what search hands
//! back. Result field names are part of the output contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::embedding::EmbeddingMeta;

/// Kind of note. Decisions and handoffs get a ranking boost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// General project notes.
    #[default]
    Note,
    /// Recorded decisions and their rationale.
    Decision,
    /// Session handoffs written for the next agent or session.
    Handoff,
    /// Session logs and transcripts.
    Session,
    /// Research and reference material.
    Research,
}

impl ContentType {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Decision => "decision",
            Self::Handoff => "handoff",
            Self::Session => "session",
            Self::Research => "research",
        }
    }

    /// Whether this type is surfaced ahead of otherwise equal notes.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Self::Decision | Self::Handoff)
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "note" => Ok(Self::Note),
            "decision" => Ok(Self::Decision),
            "handoff" => Ok(Self::Handoff),
            "session" => Ok(Self::Session),
            "research" => Ok(Self::Research),
            _ => Err(format!("unknown content type: {s}")),
        }
    }
}

/// One chunk of a note as produced by the (external) chunker and embedder.
#[derive(Debug, Clone)]
pub struct ChunkDraft {
    pub heading: String,
    pub text: String,
    pub embedding: Option<Vec<f32>>,
}

/// A whole note ready to be (re)indexed. Chunk order defines chunk indices;
/// the first chunk becomes the anchor row.
#[derive(Debug, Clone)]
pub struct NoteDraft {
    pub path: String,
    pub title: String,
    pub tags: Vec<String>,
    pub content_type: ContentType,
    pub domain: Option<String>,
    pub workstream: Option<String>,
    pub modified: DateTime<Utc>,
    pub content_hash: String,
    /// Initial confidence for a new note. Ignored when the note already exists.
    pub confidence: Option<f64>,
    pub chunks: Vec<ChunkDraft>,
    /// Triple that produced the chunk embeddings. Required if any chunk carries one.
    pub embedding_meta: Option<EmbeddingMeta>,
}

/// A stored chunk row, matching the `chunks` table schema.
#[derive(Debug, Clone, Serialize)]
pub struct NoteChunk {
    pub id: i64,
    /// Vault-relative path; unique together with `chunk_index`.
    pub path: String,
    pub title: String,
    /// 0 for the anchor row.
    pub chunk_index: u32,
    pub heading: String,
    pub text: String,
    pub tags: Vec<String>,
    pub content_type: String,
    pub domain: Option<String>,
    pub workstream: Option<String>,
    /// RFC 3339 modification timestamp of the source file.
    pub modified: String,
    pub content_hash: String,
    pub confidence: f64,
    pub access_count: u32,
    pub pinned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// Which retrieval tier produced a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchTier {
    /// Vector k-NN with composite re-ranking.
    Vector,
    /// FTS5 fallback; placeholder scores.
    FullText,
    /// Substring/keyword fallback; placeholder scores.
    Keyword,
}

impl SearchTier {
    pub fn is_degraded(&self) -> bool {
        !matches!(self, Self::Vector)
    }
}

/// A single ranked note.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub path: String,
    pub title: String,
    pub heading: String,
    pub snippet: String,
    /// Composite score for vector hits, a fixed placeholder for lexical hits. Always in `[0, 1]`.
    pub score: f64,
    /// Raw vector distance of the best chunk; absent for lexical hits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    pub domain: Option<String>,
    pub workstream: Option<String>,
    pub tags: Vec<String>,
    pub content_type: String,
    pub confidence: f64,
}

/// A [`SearchResult`] tagged with the vault it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FederatedSearchResult {
    pub vault: String,
    #[serde(flatten)]
    pub result: SearchResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_roundtrips_through_str() {
        for ct in [
            ContentType::Note,
            ContentType::Decision,
            ContentType::Handoff,
            ContentType::Session,
            ContentType::Research,
        ] {
            assert_eq!(ct.as_str().parse::<ContentType>().unwrap(), ct);
        }
        assert!("memo".parse::<ContentType>().is_err());
    }

    #[test]
    fn only_decisions_and_handoffs_are_privileged() {
        assert!(ContentType::Decision.is_privileged());
        assert!(ContentType::Handoff.is_privileged());
        assert!(!ContentType::Note.is_privileged());
        assert!(!ContentType::Session.is_privileged());
    }

    #[test]
    fn federated_result_flattens_fields() {
        let result = FederatedSearchResult {
            vault: "work".into(),
            result: SearchResult {
                path: "auth.md".into(),
                title: "Auth".into(),
                heading: String::new(),
                snippet: "jwt".into(),
                score: 0.5,
                distance: None,
                domain: None,
                workstream: None,
                tags: vec![],
                content_type: "note".into(),
                confidence: 0.5,
            },
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["vault"], "work");
        assert_eq!(json["path"], "auth.md");
        assert!(json.get("distance").is_none());
    }
}
