//! Read-only vault reports.

use std::collections::{BTreeMap, HashMap};

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::db::meta;
use crate::embedding::EmbeddingMeta;
use crate::error::Result;

/// Notes listed in the most-accessed section of a usage report.
const MOST_ACCESSED_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Stats,
    Usage,
}

impl std::str::FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "stats" => Ok(Self::Stats),
            "usage" => Ok(Self::Usage),
            _ => Err(format!("unknown report: {s} (expected stats or usage)")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "report", rename_all = "snake_case")]
pub enum VaultReport {
    Stats(StatsReport),
    Usage(UsageReport),
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub note_count: u64,
    pub chunk_count: u64,
    pub embedded_chunk_count: u64,
    pub pinned_count: u64,
    pub by_content_type: BTreeMap<String, u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<EmbeddingMeta>,
}

/// What pinned notes cost in context, and which notes get used.
#[derive(Debug, Clone, Serialize)]
pub struct UsageReport {
    pub pinned: Vec<PinnedUsage>,
    pub pinned_token_estimate: usize,
    pub most_accessed: Vec<AccessEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PinnedUsage {
    pub path: String,
    pub title: String,
    pub chunks: usize,
    pub token_estimate: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessEntry {
    pub path: String,
    pub title: String,
    pub access_count: u32,
    pub confidence: f64,
}

pub fn report(conn: &Connection, kind: ReportKind) -> Result<VaultReport> {
    Ok(match kind {
        ReportKind::Stats => VaultReport::Stats(stats(conn)?),
        ReportKind::Usage => VaultReport::Usage(usage(conn)?),
    })
}

fn count(conn: &Connection, sql: &str) -> Result<u64> {
    let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(n as u64)
}

fn stats(conn: &Connection) -> Result<StatsReport> {
    let mut by_content_type = BTreeMap::new();
    let mut stmt =
        conn.prepare("SELECT content_type, COUNT(*) FROM chunks WHERE chunk_index = 0 GROUP BY content_type")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    for (content_type, n) in rows {
        by_content_type.insert(content_type, n as u64);
    }

    Ok(StatsReport {
        note_count: count(conn, "SELECT COUNT(*) FROM chunks WHERE chunk_index = 0")?,
        chunk_count: count(conn, "SELECT COUNT(*) FROM chunks")?,
        embedded_chunk_count: count(conn, "SELECT COUNT(*) FROM chunks WHERE embedded = 1")?,
        pinned_count: count(conn, "SELECT COUNT(*) FROM chunks WHERE chunk_index = 0 AND pinned = 1")?,
        by_content_type,
        embedding: meta::get_embedding_meta(conn)?,
    })
}

fn usage(conn: &Connection) -> Result<UsageReport> {
    let mut stmt = conn.prepare(
        "SELECT path, title, text FROM chunks \
         WHERE path IN (SELECT path FROM chunks WHERE chunk_index = 0 AND pinned = 1) \
         ORDER BY path, chunk_index",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut pinned: Vec<PinnedUsage> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for (path, title, text) in rows {
        let i = *index.entry(path.clone()).or_insert_with(|| {
            pinned.push(PinnedUsage {
                path,
                title,
                chunks: 0,
                token_estimate: 0,
            });
            pinned.len() - 1
        });
        pinned[i].chunks += 1;
        pinned[i].token_estimate += super::estimate_tokens(&text);
    }
    let pinned_token_estimate = pinned.iter().map(|p| p.token_estimate).sum();

    let mut stmt = conn.prepare(
        "SELECT path, title, access_count, confidence FROM chunks \
         WHERE chunk_index = 0 AND access_count > 0 \
         ORDER BY access_count DESC, path LIMIT ?1",
    )?;
    let most_accessed = stmt
        .query_map(params![MOST_ACCESSED_LIMIT as i64], |row| {
            Ok(AccessEntry {
                path: row.get(0)?,
                title: row.get(1)?,
                access_count: row.get(2)?,
                confidence: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(UsageReport {
        pinned,
        pinned_token_estimate,
        most_accessed,
    })
}
