//! Write path and row access for note chunks.
//!
//! [`upsert_note`] replaces every row of a note inside one transaction: the
//! `chunks` rows, their FTS5 entries, and their vec0 vectors. An unchanged
//! content hash short-circuits the rewrite so stored embeddings (and therefore
//! rankings) stay stable across reindexing.

use std::collections::{HashMap, HashSet};

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::types::{NoteChunk, NoteDraft};
use crate::db::meta;
use crate::error::{Error, Result};

/// Confidence given to a note indexed for the first time.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Column list matching [`chunk_from_row`].
const CHUNK_COLUMNS: &str = "id, path, title, chunk_index, heading, text, tags, content_type, \
     domain, workstream, modified, content_hash, confidence, access_count, pinned";

/// What [`upsert_note`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum IndexOutcome {
    Inserted { chunks: usize },
    Replaced { chunks: usize },
    /// Content hash matched and no re-embedding was forced.
    Unchanged,
}

/// Per-note metadata carried by the anchor row.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorMeta {
    pub title: String,
    pub confidence: f64,
    pub access_count: u32,
    pub pinned: bool,
}

/// Insert or wholesale-replace a note's chunk rows.
///
/// Confidence, access count, and the pinned flag of an existing note survive a
/// replacement. Embedded chunks record the vault's embedding triple on first
/// use and must match it afterwards.
pub fn upsert_note(conn: &mut Connection, draft: &NoteDraft, force: bool) -> Result<IndexOutcome> {
    validate_draft(draft)?;

    let tx = conn.transaction()?;

    let existing: Option<(String, AnchorMeta)> = tx
        .query_row(
            "SELECT content_hash, title, confidence, access_count, pinned FROM chunks \
             WHERE path = ?1 AND chunk_index = 0",
            params![draft.path],
            |row| {
                Ok((
                    row.get(0)?,
                    AnchorMeta {
                        title: row.get(1)?,
                        confidence: row.get(2)?,
                        access_count: row.get(3)?,
                        pinned: row.get(4)?,
                    },
                ))
            },
        )
        .optional()?;

    if let Some((hash, _)) = &existing {
        if !force && hash == &draft.content_hash {
            tracing::debug!(path = %draft.path, "content hash unchanged, skipping");
            return Ok(IndexOutcome::Unchanged);
        }
    }

    // 1. Embedding triple gate
    let embeds = draft.chunks.iter().any(|c| c.embedding.is_some());
    if embeds {
        let active = draft.embedding_meta.as_ref().ok_or_else(|| {
            Error::InvalidInput(format!("{}: embedded chunks need an embedding triple", draft.path))
        })?;
        match meta::get_embedding_meta(&tx)? {
            None => meta::set_embedding_meta(&tx, active)?,
            Some(stored) if &stored != active => {
                return Err(Error::EmbeddingMismatch {
                    stored,
                    active: active.clone(),
                })
            }
            Some(_) => {}
        }
    }

    // 2. Drop the previous version
    delete_note_rows(&tx, &draft.path)?;

    // 3. Insert chunks, FTS rows, and vectors
    let (confidence, access_count, pinned) = match &existing {
        Some((_, anchor)) => (anchor.confidence, anchor.access_count, anchor.pinned),
        None => (draft.confidence.unwrap_or(DEFAULT_CONFIDENCE), 0, false),
    };
    let tags = serde_json::to_string(&draft.tags)?;
    let modified = draft.modified.to_rfc3339();

    for (index, chunk) in draft.chunks.iter().enumerate() {
        tx.execute(
            "INSERT INTO chunks (path, chunk_index, title, heading, text, tags, content_type, \
             domain, workstream, modified, content_hash, confidence, access_count, pinned, embedded) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                draft.path,
                index as i64,
                draft.title,
                chunk.heading,
                chunk.text,
                tags,
                draft.content_type.as_str(),
                draft.domain,
                draft.workstream,
                modified,
                draft.content_hash,
                confidence,
                access_count,
                pinned,
                chunk.embedding.is_some(),
            ],
        )?;
        let rowid = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO chunks_fts (rowid, title, heading, text, tags) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![rowid, draft.title, chunk.heading, chunk.text, tags],
        )?;

        if let Some(embedding) = &chunk.embedding {
            tx.execute(
                "INSERT INTO chunks_vec (rowid, embedding) VALUES (?1, ?2)",
                params![rowid, super::embedding_to_bytes(embedding)],
            )?;
        }
    }

    tx.commit()?;

    let chunks = draft.chunks.len();
    tracing::info!(path = %draft.path, chunks, replaced = existing.is_some(), "note indexed");
    Ok(match existing {
        Some(_) => IndexOutcome::Replaced { chunks },
        None => IndexOutcome::Inserted { chunks },
    })
}

fn validate_draft(draft: &NoteDraft) -> Result<()> {
    if draft.path.trim().is_empty() {
        return Err(Error::InvalidInput("note path must not be empty".into()));
    }
    if draft.chunks.is_empty() {
        return Err(Error::InvalidInput(format!("{}: a note needs at least one chunk", draft.path)));
    }
    if let Some(c) = draft.confidence {
        if !(0.0..=1.0).contains(&c) {
            return Err(Error::InvalidInput(format!("{}: confidence {c} outside [0, 1]", draft.path)));
        }
    }
    if let Some(active) = &draft.embedding_meta {
        for (i, chunk) in draft.chunks.iter().enumerate() {
            if let Some(e) = &chunk.embedding {
                if e.len() != active.dimensions {
                    return Err(Error::InvalidInput(format!(
                        "{} chunk {i}: embedding has {} dims, triple says {}",
                        draft.path,
                        e.len(),
                        active.dimensions
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Delete every row of a note from chunks, FTS5, and vec0. Returns rows removed.
fn delete_note_rows(conn: &Connection, path: &str) -> Result<usize> {
    let rows: Vec<(i64, String, String, String, String, bool)> = {
        let mut stmt = conn.prepare(
            "SELECT id, title, heading, text, tags, embedded FROM chunks WHERE path = ?1",
        )?;
        let collected = stmt
            .query_map(params![path], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        collected
    };

    let has_vec = meta::has_vector_table(conn)?;
    for (id, title, heading, text, tags, embedded) in &rows {
        // External content FTS5 tables need the old values to delete
        conn.execute(
            "INSERT INTO chunks_fts (chunks_fts, rowid, title, heading, text, tags) \
             VALUES ('delete', ?1, ?2, ?3, ?4, ?5)",
            params![id, title, heading, text, tags],
        )?;
        if *embedded && has_vec {
            conn.execute("DELETE FROM chunks_vec WHERE rowid = ?1", params![id])?;
        }
    }

    conn.execute("DELETE FROM chunks WHERE path = ?1", params![path])?;
    Ok(rows.len())
}

/// Remove a note whose source file is gone.
pub fn remove_note(conn: &mut Connection, path: &str) -> Result<()> {
    let tx = conn.transaction()?;
    if delete_note_rows(&tx, path)? == 0 {
        return Err(Error::NotFound(path.to_string()));
    }
    tx.commit()?;
    tracing::info!(path, "note removed");
    Ok(())
}

/// Remove every stored note whose path is not in `live_paths`. Returns the removed paths.
pub fn prune_orphans(conn: &mut Connection, live_paths: &HashSet<String>) -> Result<Vec<String>> {
    let orphans: Vec<String> = list_paths(conn)?
        .into_iter()
        .filter(|p| !live_paths.contains(p))
        .collect();
    if orphans.is_empty() {
        return Ok(orphans);
    }

    let tx = conn.transaction()?;
    for path in &orphans {
        delete_note_rows(&tx, path)?;
    }
    tx.commit()?;

    tracing::info!(count = orphans.len(), "pruned orphaned notes");
    Ok(orphans)
}

/// Drop every note, vector, and the recorded embedding triple.
pub fn rebuild(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute("INSERT INTO chunks_fts (chunks_fts) VALUES ('delete-all')", [])?;
    tx.execute("DELETE FROM chunks", [])?;
    meta::clear_embedding_meta(&tx)?;
    tx.commit()?;
    tracing::info!("vault index cleared for rebuild");
    Ok(())
}

/// All distinct note paths in lexical order.
pub fn list_paths(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT DISTINCT path FROM chunks ORDER BY path")?;
    let paths = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(paths)
}

/// Every chunk of a note in chunk order, with stored vectors attached.
pub fn get_note(conn: &Connection, path: &str) -> Result<Vec<NoteChunk>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CHUNK_COLUMNS} FROM chunks WHERE path = ?1 ORDER BY chunk_index"
    ))?;
    let mut chunks = stmt
        .query_map(params![path], chunk_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if chunks.is_empty() {
        return Err(Error::NotFound(path.to_string()));
    }

    if meta::has_vector_table(conn)? {
        let mut vec_stmt = conn.prepare("SELECT embedding FROM chunks_vec WHERE rowid = ?1")?;
        for chunk in &mut chunks {
            let bytes: Option<Vec<u8>> = vec_stmt
                .query_row(params![chunk.id], |row| row.get(0))
                .optional()?;
            chunk.embedding = bytes.map(|b| super::bytes_to_embedding(&b));
        }
    }
    Ok(chunks)
}

/// Batch-fetch chunk rows by row id (without vectors).
pub fn fetch_chunks(conn: &Connection, ids: &[i64]) -> Result<HashMap<i64, NoteChunk>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "SELECT {CHUNK_COLUMNS} FROM chunks WHERE id IN ({})",
        placeholders.join(", ")
    );
    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::types::ToSql> =
        ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();

    let rows = stmt
        .query_map(params.as_slice(), chunk_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().map(|c| (c.id, c)).collect())
}

/// Anchor-row metadata for each of `paths` that exists.
pub fn fetch_anchor_meta(conn: &Connection, paths: &[&str]) -> Result<HashMap<String, AnchorMeta>> {
    if paths.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders: Vec<String> = (1..=paths.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "SELECT path, title, confidence, access_count, pinned FROM chunks \
         WHERE chunk_index = 0 AND path IN ({})",
        placeholders.join(", ")
    );
    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::types::ToSql> =
        paths.iter().map(|p| p as &dyn rusqlite::types::ToSql).collect();

    let rows = stmt
        .query_map(params.as_slice(), |row| {
            Ok((
                row.get::<_, String>(0)?,
                AnchorMeta {
                    title: row.get(1)?,
                    confidence: row.get(2)?,
                    access_count: row.get(3)?,
                    pinned: row.get(4)?,
                },
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().collect())
}

fn chunk_from_row(row: &Row<'_>) -> rusqlite::Result<NoteChunk> {
    let tags: String = row.get(6)?;
    Ok(NoteChunk {
        id: row.get(0)?,
        path: row.get(1)?,
        title: row.get(2)?,
        chunk_index: row.get(3)?,
        heading: row.get(4)?,
        text: row.get(5)?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        content_type: row.get(7)?,
        domain: row.get(8)?,
        workstream: row.get(9)?,
        modified: row.get(10)?,
        content_hash: row.get(11)?,
        confidence: row.get(12)?,
        access_count: row.get(13)?,
        pinned: row.get(14)?,
        embedding: None,
    })
}
