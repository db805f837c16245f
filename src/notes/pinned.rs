//! Pinned notes: surfaced unconditionally, outside ranking.

use rusqlite::{params, Connection};

use crate::error::{Error, Result};

/// Pin a note and raise its confidence to 1.0.
pub fn pin(conn: &Connection, path: &str) -> Result<()> {
    let updated = conn.execute(
        "UPDATE chunks SET pinned = 1, confidence = 1.0 WHERE path = ?1 AND chunk_index = 0",
        params![path],
    )?;
    if updated == 0 {
        return Err(Error::NotFound(path.to_string()));
    }
    tracing::info!(path, "note pinned");
    Ok(())
}

/// Clear the pinned flag. Confidence is left where it is.
pub fn unpin(conn: &Connection, path: &str) -> Result<()> {
    let updated = conn.execute(
        "UPDATE chunks SET pinned = 0 WHERE path = ?1 AND chunk_index = 0",
        params![path],
    )?;
    if updated == 0 {
        return Err(Error::NotFound(path.to_string()));
    }
    tracing::info!(path, "note unpinned");
    Ok(())
}

pub fn pinned_paths(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT path FROM chunks WHERE chunk_index = 0 AND pinned = 1 ORDER BY path")?;
    let paths = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(paths)
}

/// `false` for unknown paths.
pub fn is_pinned(conn: &Connection, path: &str) -> Result<bool> {
    let pinned: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM chunks WHERE path = ?1 AND chunk_index = 0 AND pinned = 1)",
        params![path],
        |row| row.get(0),
    )?;
    Ok(pinned)
}
