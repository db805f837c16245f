mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cairn::config::CairnConfig;
use cairn::notes::report::ReportKind;

#[derive(Parser)]
#[command(name = "cairn", version, about = "Hybrid retrieval over AI assistant note vaults")]
struct Cli {
    /// Config file to use instead of ~/.cairn/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search the primary vault
    Search(cli::search::SearchArgs),
    /// Search every configured vault and merge the results
    SearchAll(cli::search::SearchArgs),
    /// Raise or lower the confidence of notes matching a path pattern
    Feedback {
        /// Vault-relative path; `*` matches anything
        pattern: String,
        /// `up` or `down`
        direction: String,
    },
    /// Pin a note so it is always surfaced
    Pin { path: String },
    /// Unpin a note
    Unpin { path: String },
    /// Print a vault report (stats or usage)
    Report {
        #[arg(default_value = "stats")]
        kind: ReportKind,
    },
    /// Check vault integrity and embedding configuration
    Doctor,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => CairnConfig::load_from(path)?,
        None => CairnConfig::load()?,
    };

    // Log to stderr so stdout stays clean for JSON output.
    let filter = EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Search(args) => cli::search::search(&config, &args)?,
        Command::SearchAll(args) => cli::search::search_all(&config, &args)?,
        Command::Feedback { pattern, direction } => cli::feedback::feedback(&config, &pattern, &direction)?,
        Command::Pin { path } => cli::feedback::pin(&config, &path)?,
        Command::Unpin { path } => cli::feedback::unpin(&config, &path)?,
        Command::Report { kind } => cli::report::report(&config, kind)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
    }

    Ok(())
}
