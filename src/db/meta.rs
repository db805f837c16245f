//! Vault metadata: schema version and the active [`EmbeddingMeta`] triple.
//!
//! The triple lives in `vault_meta` under three keys. Recording it also creates
//! the `chunks_vec` vec0 table at the triple's dimension; clearing it drops the
//! table, so stored vectors can never outlive the triple that produced them.

use rusqlite::{params, Connection, OptionalExtension};

use crate::embedding::EmbeddingMeta;
use crate::error::{Error, Result};

/// Get the schema version recorded in the vault.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT value FROM vault_meta WHERE key = 'schema_version'",
        [],
        |row| {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().unwrap_or(0))
        },
    )
}

fn get_value(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM vault_meta WHERE key = ?1",
        params![key],
        |row| row.get::<_, String>(0),
    )
    .optional()
}

/// Get the vault's recorded embedding triple, if any vectors were ever stored.
pub fn get_embedding_meta(conn: &Connection) -> rusqlite::Result<Option<EmbeddingMeta>> {
    let provider = get_value(conn, "embedding_provider")?;
    let model = get_value(conn, "embedding_model")?;
    let dims = get_value(conn, "embedding_dims")?;

    match (provider, model, dims) {
        (Some(provider), Some(model), Some(dims)) => Ok(dims
            .parse::<usize>()
            .ok()
            .map(|dimensions| EmbeddingMeta::new(provider, model, dimensions))),
        _ => Ok(None),
    }
}

/// Record the embedding triple and create the vec0 table at its dimension.
///
/// Callers must have checked that no other triple is recorded; this overwrites.
pub fn set_embedding_meta(conn: &Connection, meta: &EmbeddingMeta) -> rusqlite::Result<()> {
    let dims = meta.dimensions.to_string();
    for (key, value) in [
        ("embedding_provider", meta.provider.as_str()),
        ("embedding_model", meta.model.as_str()),
        ("embedding_dims", dims.as_str()),
    ] {
        conn.execute(
            "INSERT OR REPLACE INTO vault_meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
    }
    conn.execute_batch(&format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS chunks_vec USING vec0(embedding FLOAT[{}]);",
        meta.dimensions
    ))?;
    tracing::info!(embedding = %meta, "recorded vault embedding triple");
    Ok(())
}

/// Forget the embedding triple and drop every stored vector.
pub fn clear_embedding_meta(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM vault_meta WHERE key IN ('embedding_provider', 'embedding_model', 'embedding_dims')",
        [],
    )?;
    conn.execute_batch("DROP TABLE IF EXISTS chunks_vec;")?;
    Ok(())
}

/// Whether the vec0 table exists (it only does once a triple is recorded).
pub fn has_vector_table(conn: &Connection) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = 'chunks_vec'",
        [],
        |row| row.get(0),
    )
}

/// Fail with [`Error::EmbeddingMismatch`] unless `active` equals the recorded triple.
///
/// A vault with no recorded triple accepts anything: it holds no vectors to compare.
pub fn ensure_compatible(conn: &Connection, active: &EmbeddingMeta) -> Result<()> {
    match get_embedding_meta(conn)? {
        Some(stored) if &stored != active => Err(Error::EmbeddingMismatch {
            stored,
            active: active.clone(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::db::open_memory_database().unwrap()
    }

    #[test]
    fn fresh_vault_has_schema_version_and_no_triple() {
        let conn = test_db();
        assert_eq!(get_schema_version(&conn).unwrap(), crate::db::schema::SCHEMA_VERSION);
        assert!(get_embedding_meta(&conn).unwrap().is_none());
        assert!(!has_vector_table(&conn).unwrap());
    }

    #[test]
    fn set_and_get_embedding_meta() {
        let conn = test_db();
        let meta = EmbeddingMeta::new("ollama", "nomic-embed-text", 8);
        set_embedding_meta(&conn, &meta).unwrap();

        assert_eq!(get_embedding_meta(&conn).unwrap(), Some(meta));
        assert!(has_vector_table(&conn).unwrap());
    }

    #[test]
    fn clear_drops_vector_table() {
        let conn = test_db();
        set_embedding_meta(&conn, &EmbeddingMeta::new("ollama", "m", 4)).unwrap();
        clear_embedding_meta(&conn).unwrap();

        assert!(get_embedding_meta(&conn).unwrap().is_none());
        assert!(!has_vector_table(&conn).unwrap());
    }

    #[test]
    fn ensure_compatible_rejects_other_triples() {
        let conn = test_db();
        let stored = EmbeddingMeta::new("ollama", "nomic-embed-text", 768);
        set_embedding_meta(&conn, &stored).unwrap();

        assert!(ensure_compatible(&conn, &stored).is_ok());

        let other_model = EmbeddingMeta::new("ollama", "mxbai-embed-large", 1024);
        match ensure_compatible(&conn, &other_model) {
            Err(Error::EmbeddingMismatch { stored: s, active }) => {
                assert_eq!(s.dimensions, 768);
                assert_eq!(active.dimensions, 1024);
            }
            other => panic!("expected EmbeddingMismatch, got {other:?}"),
        }

        let other_provider = EmbeddingMeta::new("openai", "nomic-embed-text", 768);
        assert!(ensure_compatible(&conn, &other_provider).is_err());
    }

    #[test]
    fn ensure_compatible_accepts_anything_without_triple() {
        let conn = test_db();
        assert!(ensure_compatible(&conn, &EmbeddingMeta::new("x", "y", 3)).is_ok());
    }
}
