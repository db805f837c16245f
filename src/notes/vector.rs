//! Nearest-neighbour lookup over stored chunk embeddings (sqlite-vec).

use rusqlite::{params, Connection};

use crate::db::meta;
use crate::error::Result;

/// A chunk row id and its raw distance from the query vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorHit {
    pub chunk_id: i64,
    pub distance: f64,
}

/// Whether the vault holds any vectors to search.
pub fn has_embeddings(conn: &Connection) -> Result<bool> {
    if !meta::has_vector_table(conn)? {
        return Ok(false);
    }
    let any: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM chunks WHERE embedded = 1)",
        [],
        |row| row.get(0),
    )?;
    Ok(any)
}

/// k-NN over `chunks_vec`, nearest first.
///
/// The caller must already have checked the query vector against the vault's
/// embedding triple; sqlite-vec itself would only catch a dimension mismatch.
pub fn knn(conn: &Connection, embedding: &[f32], limit: usize) -> Result<Vec<VectorHit>> {
    let embedding_bytes = super::embedding_to_bytes(embedding);
    let mut stmt = conn.prepare(
        "SELECT rowid, distance FROM chunks_vec \
         WHERE embedding MATCH ?1 ORDER BY distance LIMIT ?2",
    )?;
    let hits = stmt
        .query_map(params![embedding_bytes, limit as i64], |row| {
            Ok(VectorHit {
                chunk_id: row.get(0)?,
                distance: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(hits)
}
