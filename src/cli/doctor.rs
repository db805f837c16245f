//! CLI `doctor` command: vault diagnostics for every configured vault.

use anyhow::{Context, Result};

use cairn::config::CairnConfig;
use cairn::db;
use cairn::embedding::EmbeddingMeta;

pub fn doctor(config: &CairnConfig) -> Result<()> {
    let configured = EmbeddingMeta::new(
        &config.embedding.provider,
        &config.embedding.model,
        config.embedding.dimensions,
    );

    println!("Cairn Health Report");
    println!("===================");
    println!();
    println!("Embedding provider:  {configured}");

    for vault in config.federated_vaults() {
        println!();
        println!("Vault \"{}\":", vault.name);
        println!("  Path:              {}", vault.path.display());

        if !vault.path.exists() {
            println!("  Status:            not found");
            continue;
        }

        let file_size = std::fs::metadata(&vault.path).map(|m| m.len()).unwrap_or(0);
        println!("  File size:         {}", format_bytes(file_size));

        let conn = match db::open_read_only(&vault.path) {
            Ok(conn) => conn,
            Err(e) => {
                println!("  Status:            UNREADABLE ({e:#})");
                continue;
            }
        };
        let report = db::check_vault_health(&conn).context("failed to run health check")?;

        println!("  Schema version:    {}", report.schema_version);
        println!("  sqlite-vec:        {}", report.sqlite_vec_version);
        println!("  Notes:             {}", report.note_count);
        println!("  Chunks:            {} ({} embedded)", report.chunk_count, report.embedded_chunk_count);
        match &report.embedding {
            Some(stored) if stored == &configured => println!("  Embeddings:        {stored} (match)"),
            Some(stored) => {
                println!("  Embeddings:        {stored}");
                println!("  WARNING: vault was indexed with a different model; vector search will fail until it is rebuilt.");
            }
            None => println!("  Embeddings:        (none, lexical search only)"),
        }
        if report.integrity_ok {
            println!("  Integrity check:   PASSED");
        } else {
            println!("  Integrity check:   FAILED ({})", report.integrity_details);
        }
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
