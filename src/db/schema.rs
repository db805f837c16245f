//! SQL DDL for the vault index.
//!
//! Defines the `chunks` table, its external-content `chunks_fts` (FTS5) index,
//! and `vault_meta`. The `chunks_vec` (vec0) table is not created here: its
//! dimension is only known once the first embedding arrives, see
//! [`super::meta::set_embedding_meta`].

use rusqlite::Connection;

/// The schema version written into fresh vaults.
pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_SQL: &str = r#"
-- One row per note chunk; chunk_index 0 is the note's anchor row
CREATE TABLE IF NOT EXISTS chunks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT NOT NULL,
    chunk_index INTEGER NOT NULL DEFAULT 0 CHECK(chunk_index >= 0),
    title TEXT NOT NULL,
    heading TEXT NOT NULL DEFAULT '',
    text TEXT NOT NULL,
    tags TEXT NOT NULL DEFAULT '[]',
    content_type TEXT NOT NULL DEFAULT 'note',
    domain TEXT,
    workstream TEXT,
    modified TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    confidence REAL NOT NULL DEFAULT 0.5 CHECK(confidence >= 0.0 AND confidence <= 1.0),
    access_count INTEGER NOT NULL DEFAULT 0,
    pinned INTEGER NOT NULL DEFAULT 0,
    embedded INTEGER NOT NULL DEFAULT 0,
    UNIQUE(path, chunk_index)
);

CREATE INDEX IF NOT EXISTS idx_chunks_path ON chunks(path);
CREATE INDEX IF NOT EXISTS idx_chunks_domain ON chunks(domain);
CREATE INDEX IF NOT EXISTS idx_chunks_pinned ON chunks(pinned) WHERE pinned = 1;

-- Full-text search (BM25), kept in sync by the store
CREATE VIRTUAL TABLE IF NOT EXISTS chunks_fts USING fts5(
    title,
    heading,
    text,
    tags,
    content='chunks',
    content_rowid='id'
);

-- Vault metadata: schema version and the active embedding triple
CREATE TABLE IF NOT EXISTS vault_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO vault_meta (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;
    Ok(())
}
