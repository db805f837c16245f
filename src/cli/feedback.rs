use anyhow::Result;

use cairn::config::CairnConfig;
use cairn::db;
use cairn::notes::{feedback, pinned};

pub fn feedback(config: &CairnConfig, pattern: &str, direction: &str) -> Result<()> {
    let mut conn = db::open_database(config.resolved_vault_path())?;
    let result = feedback::apply_feedback(&mut conn, pattern, direction)?;
    super::print_json(&result)
}

pub fn pin(config: &CairnConfig, path: &str) -> Result<()> {
    let conn = db::open_database(config.resolved_vault_path())?;
    pinned::pin(&conn, path)?;
    super::print_json(&serde_json::json!({ "path": path, "pinned": true }))
}

pub fn unpin(config: &CairnConfig, path: &str) -> Result<()> {
    let conn = db::open_database(config.resolved_vault_path())?;
    pinned::unpin(&conn, path)?;
    super::print_json(&serde_json::json!({ "path": path, "pinned": false }))
}
