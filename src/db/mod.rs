//! Vault database handles.
//!
//! Every vault is one SQLite file. [`open_database`] opens it read-write for
//! indexing and feedback; [`open_read_only`] gives search and federation an
//! isolated read handle that cannot mutate the vault. Paths are always passed
//! in explicitly; nothing here consults process-wide state.

pub mod meta;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use sqlite_vec::sqlite3_vec_init;
use std::path::Path;
use std::sync::Once;

use crate::embedding::EmbeddingMeta;

static SQLITE_VEC_INIT: Once = Once::new();

/// Milliseconds a connection waits on a locked database before failing.
const BUSY_TIMEOUT_MS: u64 = 5000;

/// Register the sqlite-vec extension globally. Safe to call multiple times.
pub fn load_sqlite_vec() {
    SQLITE_VEC_INIT.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite3_vec_init as *const (),
        )));
    });
}

/// Open (or create) the vault database at the given path, with extensions
/// loaded and schema initialized.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    load_sqlite_vec();

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open vault at {}", path.display()))?;

    // WAL keeps readers unblocked while an indexer writes
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.busy_timeout(std::time::Duration::from_millis(BUSY_TIMEOUT_MS))?;

    schema::init_schema(&conn).context("failed to initialize schema")?;

    tracing::info!(path = %path.display(), "vault opened");
    Ok(conn)
}

/// Open an existing vault read-only.
///
/// Fails if the file is missing, is not a SQLite database, or lacks the vault
/// schema. The returned handle is private to the caller.
pub fn open_read_only(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();
    load_sqlite_vec();

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI,
    )
    .with_context(|| format!("failed to open vault at {}", path.display()))?;
    conn.busy_timeout(std::time::Duration::from_millis(BUSY_TIMEOUT_MS))?;

    // SQLite opens lazily; touch the schema so corruption surfaces here.
    meta::get_schema_version(&conn)
        .with_context(|| format!("vault at {} is unreadable or corrupt", path.display()))?;

    tracing::debug!(path = %path.display(), "vault opened read-only");
    Ok(conn)
}

/// Open an in-memory vault, used by tests and scratch indexing.
pub fn open_memory_database() -> Result<Connection> {
    load_sqlite_vec();
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    schema::init_schema(&conn).context("failed to initialize schema")?;
    Ok(conn)
}

/// Result of [`check_vault_health`].
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub integrity_ok: bool,
    pub integrity_details: String,
    pub schema_version: u32,
    pub sqlite_vec_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<EmbeddingMeta>,
    pub note_count: u64,
    pub chunk_count: u64,
    pub embedded_chunk_count: u64,
}

/// Run integrity and bookkeeping checks over a vault.
pub fn check_vault_health(conn: &Connection) -> Result<HealthReport> {
    let integrity: String = conn
        .query_row("PRAGMA integrity_check", [], |row| row.get(0))
        .context("integrity check failed to run")?;
    let sqlite_vec_version: String = conn.query_row("SELECT vec_version()", [], |row| row.get(0))?;

    let note_count: i64 =
        conn.query_row("SELECT COUNT(DISTINCT path) FROM chunks", [], |row| row.get(0))?;
    let chunk_count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
    let embedded_chunk_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM chunks WHERE embedded = 1",
        [],
        |row| row.get(0),
    )?;

    Ok(HealthReport {
        integrity_ok: integrity == "ok",
        integrity_details: integrity,
        schema_version: meta::get_schema_version(conn)?,
        sqlite_vec_version,
        embedding: meta::get_embedding_meta(conn)?,
        note_count: note_count as u64,
        chunk_count: chunk_count as u64,
        embedded_chunk_count: embedded_chunk_count as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_check_on_fresh_vault() {
        let conn = open_memory_database().unwrap();
        let report = check_vault_health(&conn).unwrap();
        assert!(report.integrity_ok);
        assert_eq!(report.schema_version, schema::SCHEMA_VERSION);
        assert!(!report.sqlite_vec_version.is_empty());
        assert!(report.embedding.is_none());
        assert_eq!(report.chunk_count, 0);
    }

    #[test]
    fn read_only_rejects_missing_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(open_read_only(tmp.path().join("absent.db")).is_err());
    }

    #[test]
    fn read_only_handle_cannot_write() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("vault.db");
        drop(open_database(&path).unwrap());

        let conn = open_read_only(&path).unwrap();
        let result = conn.execute(
            "INSERT INTO vault_meta (key, value) VALUES ('x', 'y')",
            [],
        );
        assert!(result.is_err());
    }
}
