//! Tiered hybrid search over one vault.
//!
//! Vector k-NN with composite re-ranking when the vault has embeddings and the
//! provider answers; otherwise full-text, then keyword. Every tier dedups by
//! path so a note appears at most once.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, warn};

use super::lexical;
use super::scoring::{self, DistanceRange, Profile, Signals};
use super::store::{self, AnchorMeta};
use super::types::{NoteChunk, SearchResult, SearchTier};
use super::vector;
use crate::db::meta;
use crate::embedding::{EmbeddingMeta, EmbeddingProvider};
use crate::error::{Error, Result};

/// Knobs that stay fixed across queries.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub profile: Profile,
    /// Candidates fetched per requested result before dedup.
    pub overfetch_factor: usize,
    pub recency_half_life_days: f64,
    pub snippet_chars: usize,
    /// "Now" for recency scoring. `None` uses the wall clock.
    pub reference_time: Option<DateTime<Utc>>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            overfetch_factor: 5,
            recency_half_life_days: 30.0,
            snippet_chars: 200,
            reference_time: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: usize,
    /// Exact-match domain filter.
    pub domain: Option<String>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, top_k: usize) -> Self {
        Self {
            query: query.into(),
            top_k,
            domain: None,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    /// `true` whenever a lexical tier produced the results.
    pub degraded: bool,
    pub tier: SearchTier,
}

/// A query embedding tagged with the triple that produced it.
///
/// `meta.dimensions` is the length of the returned vector, not what the
/// provider claims.
#[derive(Debug, Clone)]
pub struct QueryVector {
    pub meta: EmbeddingMeta,
    pub values: Vec<f32>,
}

/// Reject requests that could never produce results.
pub fn validate(request: &SearchRequest) -> Result<()> {
    if request.query.trim().is_empty() {
        return Err(Error::InvalidInput("query must not be empty".into()));
    }
    if request.top_k == 0 {
        return Err(Error::InvalidInput("top_k must be at least 1".into()));
    }
    Ok(())
}

/// Embed the query, or `None` if the provider fails in any way.
pub fn embed_query(provider: &dyn EmbeddingProvider, query: &str) -> Option<QueryVector> {
    match provider.embed_query(query) {
        Ok(values) if values.is_empty() => {
            warn!(provider = provider.name(), "provider returned an empty vector, using lexical search");
            None
        }
        Ok(values) => Some(QueryVector {
            meta: EmbeddingMeta::new(provider.name(), provider.model(), values.len()),
            values,
        }),
        Err(e) => {
            warn!(provider = provider.name(), error = %e, "query embedding failed, using lexical search");
            None
        }
    }
}

/// Search one vault, embedding the query with `provider` if the vault has vectors.
///
/// The provider's declared triple is checked against the vault before any
/// network call, and the returned vector is checked again.
pub fn search(
    conn: &Connection,
    provider: Option<&dyn EmbeddingProvider>,
    request: &SearchRequest,
    options: &SearchOptions,
) -> Result<SearchResponse> {
    validate(request)?;

    let query_vector = match provider {
        Some(p) if vector::has_embeddings(conn)? => {
            meta::ensure_compatible(conn, &p.meta())?;
            embed_query(p, &request.query)
        }
        Some(_) => {
            debug!("vault has no stored embeddings");
            None
        }
        None => None,
    };

    search_with_vector(conn, query_vector.as_ref(), request, options)
}

/// Search one vault with a precomputed query vector (or none).
pub fn search_with_vector(
    conn: &Connection,
    query_vector: Option<&QueryVector>,
    request: &SearchRequest,
    options: &SearchOptions,
) -> Result<SearchResponse> {
    validate(request)?;

    if let Some(qv) = query_vector {
        if vector::has_embeddings(conn)? {
            meta::ensure_compatible(conn, &qv.meta)?;
            if let Some(results) = vector_tier(conn, qv, request, options)? {
                debug!(results = results.len(), "vector tier");
                return Ok(SearchResponse {
                    results,
                    degraded: false,
                    tier: SearchTier::Vector,
                });
            }
            debug!("no vector candidates, falling back to lexical tiers");
        }
    }

    lexical_tiers(conn, request, options)
}

fn effective_limit(request: &SearchRequest, options: &SearchOptions) -> usize {
    request.top_k.min(options.profile.weights().max_results)
}

fn overfetch(request: &SearchRequest, options: &SearchOptions) -> usize {
    request.top_k.saturating_mul(options.overfetch_factor.max(1))
}

fn domain_matches(chunk: &NoteChunk, domain: Option<&str>) -> bool {
    domain.map_or(true, |d| chunk.domain.as_deref() == Some(d))
}

/// `None` means no candidates survived dedup and the domain filter.
fn vector_tier(
    conn: &Connection,
    qv: &QueryVector,
    request: &SearchRequest,
    options: &SearchOptions,
) -> Result<Option<Vec<SearchResult>>> {
    let hits = vector::knn(conn, &qv.values, overfetch(request, options))?;
    let ids: Vec<i64> = hits.iter().map(|h| h.chunk_id).collect();
    let mut chunks = store::fetch_chunks(conn, &ids)?;

    // Best chunk per note
    let mut best: HashMap<String, (NoteChunk, f64)> = HashMap::new();
    for hit in &hits {
        let Some(chunk) = chunks.remove(&hit.chunk_id) else {
            continue;
        };
        match best.entry(chunk.path.clone()) {
            Entry::Vacant(e) => {
                e.insert((chunk, hit.distance));
            }
            Entry::Occupied(mut e) => {
                let (current, distance) = e.get();
                if hit.distance < *distance
                    || (hit.distance == *distance && chunk.chunk_index < current.chunk_index)
                {
                    e.insert((chunk, hit.distance));
                }
            }
        }
    }

    let Some(range) = DistanceRange::from_distances(best.values().map(|(_, d)| *d)) else {
        return Ok(None);
    };

    let candidates: Vec<(NoteChunk, f64)> = best
        .into_values()
        .filter(|(chunk, _)| domain_matches(chunk, request.domain.as_deref()))
        .collect();
    debug!(hits = hits.len(), candidates = candidates.len(), "vector candidates");
    if candidates.is_empty() {
        return Ok(None);
    }

    let paths: Vec<&str> = candidates.iter().map(|(c, _)| c.path.as_str()).collect();
    let anchors = store::fetch_anchor_meta(conn, &paths)?;

    let weights = options.profile.weights();
    let now = options.reference_time.unwrap_or_else(Utc::now);

    let mut results: Vec<SearchResult> = candidates
        .iter()
        .map(|(chunk, distance)| {
            let anchor = anchors.get(&chunk.path);
            let signals = Signals {
                similarity: range.similarity(*distance),
                recency: scoring::recency_score(&chunk.modified, now, options.recency_half_life_days),
                confidence: anchor.map_or(chunk.confidence, |a| a.confidence),
                boost: scoring::content_type_boost(&chunk.content_type),
            };
            let score = scoring::composite(&weights, &signals);
            build_result(chunk, anchor, score, Some(*distance), options.snippet_chars)
        })
        .filter(|r| r.score >= weights.min_score)
        .collect();

    results.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.path.cmp(&b.path)));
    results.truncate(effective_limit(request, options));
    Ok(Some(results))
}

fn lexical_tiers(
    conn: &Connection,
    request: &SearchRequest,
    options: &SearchOptions,
) -> Result<SearchResponse> {
    let fetch = overfetch(request, options);

    match lexical::full_text(conn, &request.query, fetch) {
        Ok(hits) => {
            let results =
                lexical_results(conn, &hits, request, options, scoring::FULL_TEXT_PLACEHOLDER_SCORE)?;
            if !results.is_empty() {
                debug!(results = results.len(), "full-text tier");
                return Ok(SearchResponse {
                    results,
                    degraded: true,
                    tier: SearchTier::FullText,
                });
            }
            debug!("full-text tier empty, trying keyword");
        }
        Err(e) => warn!(error = %e, "full-text search failed, trying keyword"),
    }

    let hits = lexical::keyword(conn, &request.query, fetch)?;
    let results = lexical_results(conn, &hits, request, options, scoring::KEYWORD_PLACEHOLDER_SCORE)?;
    debug!(results = results.len(), "keyword tier");
    Ok(SearchResponse {
        results,
        degraded: true,
        tier: SearchTier::Keyword,
    })
}

/// Hits arrive best first; the first chunk seen for a path wins.
fn lexical_results(
    conn: &Connection,
    ids: &[i64],
    request: &SearchRequest,
    options: &SearchOptions,
    score: f64,
) -> Result<Vec<SearchResult>> {
    let mut chunks = store::fetch_chunks(conn, ids)?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut kept: Vec<NoteChunk> = Vec::new();
    for id in ids {
        let Some(chunk) = chunks.remove(id) else {
            continue;
        };
        if !domain_matches(&chunk, request.domain.as_deref()) || !seen.insert(chunk.path.clone()) {
            continue;
        }
        kept.push(chunk);
        if kept.len() == effective_limit(request, options) {
            break;
        }
    }

    let paths: Vec<&str> = kept.iter().map(|c| c.path.as_str()).collect();
    let anchors = store::fetch_anchor_meta(conn, &paths)?;

    Ok(kept
        .iter()
        .map(|chunk| build_result(chunk, anchors.get(&chunk.path), score, None, options.snippet_chars))
        .collect())
}

fn build_result(
    chunk: &NoteChunk,
    anchor: Option<&AnchorMeta>,
    score: f64,
    distance: Option<f64>,
    snippet_chars: usize,
) -> SearchResult {
    SearchResult {
        path: chunk.path.clone(),
        title: anchor.map_or_else(|| chunk.title.clone(), |a| a.title.clone()),
        heading: chunk.heading.clone(),
        snippet: super::snippet(&chunk.text, snippet_chars),
        score,
        distance,
        domain: chunk.domain.clone(),
        workstream: chunk.workstream.clone(),
        tags: chunk.tags.clone(),
        content_type: chunk.content_type.clone(),
        confidence: anchor.map_or(chunk.confidence, |a| a.confidence),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::store::upsert_note;
    use crate::notes::types::{ChunkDraft, ContentType, NoteDraft};
    use chrono::TimeZone;

    const DIMS: usize = 4;

    struct FakeProvider {
        dims: usize,
        vector: Option<Vec<f32>>,
    }

    impl EmbeddingProvider for FakeProvider {
        fn name(&self) -> &str {
            "test"
        }
        fn model(&self) -> &str {
            "spike"
        }
        fn dimensions(&self) -> usize {
            self.dims
        }
        fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
            self.vector
                .clone()
                .ok_or_else(|| Error::ProviderUnavailable("connection refused".into()))
        }
    }

    fn spike(i: usize) -> Vec<f32> {
        let mut v = vec![0.0f32; DIMS];
        v[i] = 1.0;
        v
    }

    fn modified() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn options(profile: Profile) -> SearchOptions {
        SearchOptions {
            profile,
            reference_time: Some(modified()),
            ..SearchOptions::default()
        }
    }

    fn note(path: &str, domain: &str, chunks: &[(&str, usize)]) -> NoteDraft {
        NoteDraft {
            path: path.into(),
            title: format!("Title {path}"),
            tags: vec![],
            content_type: ContentType::Note,
            domain: Some(domain.into()),
            workstream: None,
            modified: modified(),
            content_hash: format!("hash-{path}"),
            confidence: None,
            chunks: chunks
                .iter()
                .enumerate()
                .map(|(i, (text, axis))| ChunkDraft {
                    heading: format!("Part {i}"),
                    text: text.to_string(),
                    embedding: Some(spike(*axis)),
                })
                .collect(),
            embedding_meta: Some(EmbeddingMeta::new("test", "spike", DIMS)),
        }
    }

    fn test_db() -> Connection {
        let mut conn = crate::db::open_memory_database().unwrap();
        upsert_note(&mut conn, &note("a.md", "backend", &[("alpha jwt-tokens", 0), ("alpha more", 1)]), false)
            .unwrap();
        upsert_note(&mut conn, &note("b.md", "backend", &[("bravo deploy", 2)]), false).unwrap();
        upsert_note(&mut conn, &note("c.md", "frontend", &[("charlie jwt-tokens", 0)]), false).unwrap();
        conn
    }

    fn provider(axis: usize) -> FakeProvider {
        FakeProvider {
            dims: DIMS,
            vector: Some(spike(axis)),
        }
    }

    #[test]
    fn empty_query_and_zero_top_k_are_rejected() {
        let conn = test_db();
        let opts = SearchOptions::default();
        assert!(matches!(
            search(&conn, None, &SearchRequest::new("   ", 5), &opts),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            search(&conn, None, &SearchRequest::new("alpha", 0), &opts),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn vector_tier_keeps_best_chunk_per_note() {
        let conn = test_db();
        let p = provider(0);
        let resp = search(&conn, Some(&p), &SearchRequest::new("alpha", 10), &options(Profile::Broad)).unwrap();

        assert_eq!(resp.tier, SearchTier::Vector);
        assert!(!resp.degraded);
        let paths: Vec<&str> = resp.results.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths.iter().filter(|p| **p == "a.md").count(), 1);
        // a.md and c.md tie on distance 0 and break on path
        assert_eq!(&paths[..2], &["a.md", "c.md"]);
        assert_eq!(resp.results[0].heading, "Part 0");
        assert_eq!(resp.results[0].distance, Some(0.0));
        assert!(resp.results.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(resp.results.iter().all(|r| (0.0..=1.0).contains(&r.score)));
    }

    #[test]
    fn domain_filter_is_exact() {
        let conn = test_db();
        let p = provider(0);
        let req = SearchRequest::new("jwt", 10).with_domain("frontend");
        let resp = search(&conn, Some(&p), &req, &options(Profile::Broad)).unwrap();
        assert_eq!(resp.results.len(), 1);
        assert_eq!(resp.results[0].path, "c.md");

        let none = SearchRequest::new("jwt", 10).with_domain("front");
        let resp = search(&conn, None, &none, &options(Profile::Broad)).unwrap();
        assert!(resp.results.is_empty());
    }

    #[test]
    fn min_score_drops_weak_vector_candidates() {
        let conn = test_db();
        let p = provider(2);
        let resp = search(&conn, Some(&p), &SearchRequest::new("deploy", 10), &options(Profile::Precise)).unwrap();
        // b.md is exact; the rest sit at similarity 0 and score at most 0.2
        assert_eq!(resp.tier, SearchTier::Vector);
        assert_eq!(resp.results.len(), 1);
        assert_eq!(resp.results[0].path, "b.md");
    }

    #[test]
    fn result_count_is_capped_by_profile() {
        let mut conn = crate::db::open_memory_database().unwrap();
        for i in 0..8 {
            upsert_note(&mut conn, &note(&format!("n{i}.md"), "d", &[("same text", 0)]), false).unwrap();
        }
        let p = provider(0);
        let resp = search(&conn, Some(&p), &SearchRequest::new("same", 20), &options(Profile::Precise)).unwrap();
        assert_eq!(resp.results.len(), 5);

        let resp = search(&conn, Some(&p), &SearchRequest::new("same", 3), &options(Profile::Broad)).unwrap();
        assert_eq!(resp.results.len(), 3);
    }

    #[test]
    fn no_provider_uses_full_text_placeholder() {
        let conn = test_db();
        let resp = search(&conn, None, &SearchRequest::new("jwt-tokens", 10), &options(Profile::Balanced)).unwrap();
        assert_eq!(resp.tier, SearchTier::FullText);
        assert!(resp.degraded);
        assert_eq!(resp.results.len(), 2);
        assert!(resp
            .results
            .iter()
            .all(|r| r.score == scoring::FULL_TEXT_PLACEHOLDER_SCORE && r.distance.is_none()));
    }

    #[test]
    fn failing_provider_degrades() {
        let conn = test_db();
        let down = FakeProvider { dims: DIMS, vector: None };
        let resp = search(&conn, Some(&down), &SearchRequest::new("bravo", 10), &options(Profile::Balanced)).unwrap();
        assert!(resp.degraded);
        assert_eq!(resp.results[0].path, "b.md");
    }

    #[test]
    fn substring_only_match_uses_keyword_tier() {
        let conn = test_db();
        // "token" is not an FTS token of "jwt-tokens" but is a substring
        let resp = search(&conn, None, &SearchRequest::new("token", 10), &options(Profile::Balanced)).unwrap();
        assert_eq!(resp.tier, SearchTier::Keyword);
        assert!(resp.degraded);
        assert!(!resp.results.is_empty());
        assert!(resp.results.iter().all(|r| r.score == scoring::KEYWORD_PLACEHOLDER_SCORE));
    }

    #[test]
    fn declared_dimension_mismatch_fails_before_embedding() {
        let conn = test_db();
        let wide = FakeProvider { dims: 8, vector: None };
        let err = search(&conn, Some(&wide), &SearchRequest::new("alpha", 10), &options(Profile::Balanced))
            .unwrap_err();
        assert!(matches!(err, Error::EmbeddingMismatch { .. }));
    }

    #[test]
    fn actual_vector_length_is_checked() {
        let conn = test_db();
        let liar = FakeProvider {
            dims: DIMS,
            vector: Some(vec![1.0; 6]),
        };
        let err = search(&conn, Some(&liar), &SearchRequest::new("alpha", 10), &options(Profile::Balanced))
            .unwrap_err();
        assert!(matches!(err, Error::EmbeddingMismatch { .. }));
    }

    #[test]
    fn lexical_vault_ignores_provider() {
        let mut conn = crate::db::open_memory_database().unwrap();
        let mut plain = note("plain.md", "d", &[("plain words here", 0)]);
        plain.chunks[0].embedding = None;
        plain.embedding_meta = None;
        upsert_note(&mut conn, &plain, false).unwrap();

        let p = provider(0);
        let resp = search(&conn, Some(&p), &SearchRequest::new("plain", 10), &options(Profile::Balanced)).unwrap();
        assert_eq!(resp.tier, SearchTier::FullText);
        assert_eq!(resp.results[0].path, "plain.md");
    }
}
