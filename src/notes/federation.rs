//! One query fanned across several vaults.
//!
//! The query is embedded once. Each vault is then searched on its own blocking
//! worker with a private read-only handle and its own timeout. A vault that
//! fails to open, errors, or times out is skipped with a warning; the call
//! only fails when no vault answers at all.
//!
//! Similarity is normalized per vault, so composite scores from different
//! vaults are only roughly comparable. A vault with no embeddings answers with
//! lexical placeholder scores even when a query vector exists, and those are
//! merged on the same scale as composite scores.
//!
//! Vault names tag every result and key the dedup, so they must be unique.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use super::search::{self, QueryVector, SearchOptions, SearchRequest, SearchResponse};
use super::types::FederatedSearchResult;
use crate::db;
use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};

/// A named vault database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultSpec {
    pub name: String,
    pub path: PathBuf,
}

impl VaultSpec {
    pub fn new(name: &str, path: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            path,
        }
    }
}

/// A vault that was skipped, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VaultWarning {
    pub vault: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct FederationOptions {
    pub search: SearchOptions,
    pub per_vault_timeout: Duration,
}

impl Default for FederationOptions {
    fn default() -> Self {
        Self {
            search: SearchOptions::default(),
            per_vault_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FederatedResponse {
    pub results: Vec<FederatedSearchResult>,
    /// No global query vector, or at least one vault answered lexically.
    pub degraded: bool,
    pub warnings: Vec<VaultWarning>,
    /// Vaults that produced a result set (possibly empty).
    pub vaults_searched: usize,
}

/// Search every vault concurrently and merge the tagged results.
pub async fn search_all(
    provider: Option<Arc<dyn EmbeddingProvider>>,
    request: &SearchRequest,
    vaults: &[VaultSpec],
    options: &FederationOptions,
) -> Result<FederatedResponse> {
    search::validate(request)?;
    if vaults.is_empty() {
        return Err(Error::InvalidInput("no vaults to search".into()));
    }
    let mut names = HashSet::new();
    if let Some(dup) = vaults.iter().find(|v| !names.insert(v.name.as_str())) {
        return Err(Error::InvalidInput(format!("duplicate vault name: {}", dup.name)));
    }

    let query_vector = match provider {
        Some(provider) => {
            let query = request.query.clone();
            tokio::task::spawn_blocking(move || search::embed_query(provider.as_ref(), &query))
                .await
                .unwrap_or_else(|e| {
                    warn!(error = %e, "query embedding task failed");
                    None
                })
        }
        None => None,
    }
    .map(Arc::new);

    let request_for_workers = request.clone();
    let search_options = options.search.clone();
    let vector_for_workers = query_vector.clone();
    let (answered, warnings) = fan_out(vaults, options.per_vault_timeout, move |vault| {
        search_vault(
            vault,
            vector_for_workers.as_deref(),
            &request_for_workers,
            &search_options,
        )
    })
    .await;

    if answered.is_empty() {
        return Err(Error::NoUsableVaults(
            warnings
                .iter()
                .map(|w| format!("{}: {}", w.vault, w.message))
                .collect(),
        ));
    }

    let vector_mode = query_vector.is_some();
    let degraded = !vector_mode || answered.iter().any(|(_, r)| r.degraded);
    let vaults_searched = answered.len();
    let results = merge(answered, vector_mode, request.top_k);

    Ok(FederatedResponse {
        results,
        degraded,
        warnings,
        vaults_searched,
    })
}

/// Run `search` for every vault on its own blocking worker under `timeout`.
///
/// Every vault is spawned before any is awaited, so the timeouts run
/// concurrently.
async fn fan_out<F>(
    vaults: &[VaultSpec],
    timeout: Duration,
    search: F,
) -> (Vec<(String, SearchResponse)>, Vec<VaultWarning>)
where
    F: Fn(&VaultSpec) -> anyhow::Result<SearchResponse> + Send + Sync + 'static,
{
    let search = Arc::new(search);
    let mut handles = Vec::with_capacity(vaults.len());
    for vault in vaults {
        let name = vault.name.clone();
        let vault = vault.clone();
        let search = Arc::clone(&search);

        let handle = tokio::spawn(async move {
            let worker = tokio::task::spawn_blocking(move || search(&vault));
            tokio::time::timeout(timeout, worker).await
        });
        handles.push((name, handle));
    }

    let mut answered = Vec::new();
    let mut warnings = Vec::new();
    for (name, handle) in handles {
        let message = match handle.await {
            Ok(Ok(Ok(Ok(response)))) => {
                debug!(vault = %name, results = response.results.len(), tier = ?response.tier, "vault answered");
                answered.push((name, response));
                continue;
            }
            Ok(Ok(Ok(Err(e)))) => format!("{e:#}"),
            Ok(Ok(Err(e))) | Err(e) => format!("search worker failed: {e}"),
            Ok(Err(_)) => format!("timed out after {} ms", timeout.as_millis()),
        };
        warn!(vault = %name, %message, "skipping vault");
        warnings.push(VaultWarning {
            vault: name,
            message,
        });
    }
    (answered, warnings)
}

fn search_vault(
    vault: &VaultSpec,
    query_vector: Option<&QueryVector>,
    request: &SearchRequest,
    options: &SearchOptions,
) -> anyhow::Result<SearchResponse> {
    let conn = db::open_read_only(&vault.path)?;
    Ok(search::search_with_vector(&conn, query_vector, request, options)?)
}

/// Tag, dedup on (vault, path), order, and truncate.
///
/// With a global query vector results order by score. Without one every score
/// is a tier placeholder, so ties fall to each vault's own rank first.
fn merge(
    answered: Vec<(String, SearchResponse)>,
    vector_mode: bool,
    top_k: usize,
) -> Vec<FederatedSearchResult> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut ranked: Vec<(usize, FederatedSearchResult)> = Vec::new();
    for (vault, response) in answered {
        for (rank, result) in response.results.into_iter().enumerate() {
            if !seen.insert((vault.clone(), result.path.clone())) {
                continue;
            }
            ranked.push((
                rank,
                FederatedSearchResult {
                    vault: vault.clone(),
                    result,
                },
            ));
        }
    }

    ranked.sort_by(|(rank_a, a), (rank_b, b)| {
        let by_score = b.result.score.total_cmp(&a.result.score);
        let by_rank = if vector_mode {
            Ordering::Equal
        } else {
            rank_a.cmp(rank_b)
        };
        by_score
            .then(by_rank)
            .then_with(|| a.vault.cmp(&b.vault))
            .then_with(|| a.result.path.cmp(&b.result.path))
    });
    ranked.truncate(top_k);
    ranked.into_iter().map(|(_, r)| r).collect()
}
