use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::notes::federation::VaultSpec;
use crate::notes::scoring::Profile;
use crate::notes::search::SearchOptions;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct CairnConfig {
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub federation: FederationConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub vault_path: String,
    pub vault_name: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub dimensions: usize,
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_top_k: usize,
    pub profile: String,
    pub overfetch_factor: usize,
    pub recency_half_life_days: f64,
    pub snippet_chars: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FederationConfig {
    pub per_vault_timeout_ms: u64,
    pub vaults: Vec<VaultEntry>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VaultEntry {
    pub name: String,
    pub path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let vault_path = default_cairn_dir()
            .join("vault.db")
            .to_string_lossy()
            .into_owned();
        Self {
            vault_path,
            vault_name: "default".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".into(),
            model: "nomic-embed-text".into(),
            base_url: "http://localhost:11434".into(),
            dimensions: 768,
            timeout_ms: 2000,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: 10,
            profile: "balanced".into(),
            overfetch_factor: 5,
            recency_half_life_days: 30.0,
            snippet_chars: 200,
        }
    }
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            per_vault_timeout_ms: 5000,
            vaults: Vec::new(),
        }
    }
}

/// Returns `~/.cairn/`
pub fn default_cairn_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cairn")
}

/// Returns the default config file path: `~/.cairn/config.toml`
pub fn default_config_path() -> PathBuf {
    default_cairn_dir().join("config.toml")
}

impl CairnConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            CairnConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (CAIRN_VAULT, CAIRN_LOG_LEVEL, CAIRN_EMBED_URL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CAIRN_VAULT") {
            self.storage.vault_path = val;
        }
        if let Ok(val) = std::env::var("CAIRN_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("CAIRN_EMBED_URL") {
            self.embedding.base_url = val;
        }
    }

    /// Resolve the primary vault's database path, expanding `~` if needed.
    pub fn resolved_vault_path(&self) -> PathBuf {
        expand_tilde(&self.storage.vault_path)
    }

    /// Build search options from the retrieval section.
    pub fn search_options(&self) -> Result<SearchOptions> {
        let profile: Profile = self
            .retrieval
            .profile
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?;
        Ok(SearchOptions {
            profile,
            overfetch_factor: self.retrieval.overfetch_factor.max(1),
            recency_half_life_days: self.retrieval.recency_half_life_days,
            snippet_chars: self.retrieval.snippet_chars,
            reference_time: None,
        })
    }

    /// Vaults to federate over. Falls back to the primary vault alone when the
    /// `[federation]` section lists none.
    pub fn federated_vaults(&self) -> Vec<VaultSpec> {
        if self.federation.vaults.is_empty() {
            return vec![VaultSpec::new(
                &self.storage.vault_name,
                self.resolved_vault_path(),
            )];
        }
        self.federation
            .vaults
            .iter()
            .map(|v| VaultSpec::new(&v.name, expand_tilde(&v.path)))
            .collect()
    }

    pub fn per_vault_timeout(&self) -> Duration {
        Duration::from_millis(self.federation.per_vault_timeout_ms)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
