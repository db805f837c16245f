pub mod doctor;
pub mod feedback;
pub mod report;
pub mod search;

use anyhow::Result;
use serde::Serialize;

/// Pretty-print a value as JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
