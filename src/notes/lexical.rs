//! Lexical retrieval: FTS5 BM25 search and a last-resort keyword matcher.
//!
//! Both tiers work from the same extracted query terms. Full-text search ORs
//! the quoted terms so multi-word queries still match partially; the keyword
//! matcher counts how many terms appear as substrings of a chunk and needs no
//! FTS index at all. Both tiers return chunk row ids, best match first.

use rusqlite::{params, Connection};

use crate::error::Result;

/// Upper bound on terms taken from a single query.
const MAX_TERMS: usize = 16;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "do", "for", "from", "how", "in", "is", "it",
    "of", "on", "or", "the", "to", "was", "what", "when", "where", "which", "who", "why", "with",
];

/// Lowercased, deduplicated query terms with stopwords and single characters removed.
///
/// Hyphens and underscores stay inside terms so identifiers like `jwt-tokens`
/// survive intact.
pub fn extract_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for raw in query.split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_')) {
        let term = raw.trim_matches(|c| c == '-' || c == '_').to_lowercase();
        if term.chars().count() < 2 || STOPWORDS.contains(&term.as_str()) {
            continue;
        }
        if !terms.contains(&term) {
            terms.push(term);
        }
        if terms.len() == MAX_TERMS {
            break;
        }
    }
    terms
}

/// Build an FTS5 MATCH expression: each term double-quoted, joined with OR.
fn fts_expression(terms: &[String]) -> String {
    terms
        .iter()
        .map(|t| format!("\"{}\"", t.replace('"', "")))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// FTS5 BM25 search, best match first.
///
/// Errors (e.g. a damaged FTS index) are returned so the caller can drop to
/// the keyword tier.
pub fn full_text(conn: &Connection, query: &str, limit: usize) -> Result<Vec<i64>> {
    let terms = extract_terms(query);
    if terms.is_empty() {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(
        "SELECT rowid FROM chunks_fts \
         WHERE chunks_fts MATCH ?1 ORDER BY rank, rowid LIMIT ?2",
    )?;
    let ids = stmt
        .query_map(params![fts_expression(&terms), limit as i64], |row| row.get(0))?
        .collect::<std::result::Result<Vec<i64>, _>>()?;
    Ok(ids)
}

/// Substring matcher over title, heading, text, and tags.
///
/// Ranks chunks by the number of distinct query terms they contain, then by
/// path and chunk index. Case folding happens here rather than in SQLite,
/// whose `lower()` only folds ASCII.
pub fn keyword(conn: &Connection, query: &str, limit: usize) -> Result<Vec<i64>> {
    let terms = extract_terms(query);
    if terms.is_empty() {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(
        "SELECT id, title || ' ' || heading || ' ' || text || ' ' || tags \
         FROM chunks ORDER BY path, chunk_index",
    )?;
    let mut rows = stmt.query([])?;
    let mut matches: Vec<(usize, i64)> = Vec::new();
    while let Some(row) = rows.next()? {
        let id: i64 = row.get(0)?;
        let haystack: String = row.get(1)?;
        let haystack = haystack.to_lowercase();
        let matched = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
        if matched > 0 {
            matches.push((matched, id));
        }
    }

    // Stable sort keeps the path order within each match count.
    matches.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(matches.into_iter().take(limit).map(|(_, id)| id).collect())
}
