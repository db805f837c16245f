use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use cairn::config::CairnConfig;
use cairn::db;
use cairn::embedding::{self, EmbeddingProvider};
use cairn::notes::federation::{self, FederationOptions};
use cairn::notes::scoring::Profile;
use cairn::notes::search::{self, SearchOptions, SearchRequest};

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Query text
    pub query: String,

    /// Maximum results (defaults to retrieval.default_top_k)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Only return notes in this domain
    #[arg(long)]
    pub domain: Option<String>,

    /// Ranking profile: precise, balanced, or broad
    #[arg(long)]
    pub profile: Option<Profile>,
}

impl SearchArgs {
    fn request(&self, config: &CairnConfig) -> SearchRequest {
        let request = SearchRequest::new(
            self.query.clone(),
            self.top_k.unwrap_or(config.retrieval.default_top_k),
        );
        match &self.domain {
            Some(domain) => request.with_domain(domain.clone()),
            None => request,
        }
    }

    fn options(&self, config: &CairnConfig) -> Result<SearchOptions> {
        let mut options = config.search_options()?;
        if let Some(profile) = self.profile {
            options.profile = profile;
        }
        Ok(options)
    }
}

/// Search the primary vault and print the response as JSON.
pub fn search(config: &CairnConfig, args: &SearchArgs) -> Result<()> {
    let conn = db::open_read_only(config.resolved_vault_path())?;
    let provider = embedding::create_provider(&config.embedding)?;

    let response = search::search(
        &conn,
        provider.as_deref(),
        &args.request(config),
        &args.options(config)?,
    )?;
    super::print_json(&response)
}

/// Search every configured vault and print the merged response as JSON.
pub fn search_all(config: &CairnConfig, args: &SearchArgs) -> Result<()> {
    // Built outside the runtime: the blocking HTTP client owns its own.
    let provider: Option<Arc<dyn EmbeddingProvider>> =
        embedding::create_provider(&config.embedding)?.map(Arc::from);

    let options = FederationOptions {
        search: args.options(config)?,
        per_vault_timeout: config.per_vault_timeout(),
    };
    let request = args.request(config);
    let vaults = config.federated_vaults();

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let response = runtime.block_on(federation::search_all(provider, &request, &vaults, &options))?;
    super::print_json(&response)
}
