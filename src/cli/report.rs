use anyhow::Result;

use cairn::config::CairnConfig;
use cairn::db;
use cairn::notes::report::{self, ReportKind};

pub fn report(config: &CairnConfig, kind: ReportKind) -> Result<()> {
    let conn = db::open_read_only(config.resolved_vault_path())?;
    let report = report::report(&conn, kind)?;
    super::print_json(&report)
}
