//! Configuration loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use aiqx_core::pack::TierName;

/// Where packs are listed and fetched from.
///
/// Note: Custom Debug impl masks the token to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default = "default_repo")]
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Only `.json` files under this prefix are listed.
    #[serde(default = "default_pack_prefix")]
    pub pack_prefix: String,
    /// How long a fetched listing is reused.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// Max concurrent document fetches.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Retries on transient fetch errors.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Delay between retries in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Override for the GitHub REST API root.
    #[serde(default)]
    pub api_base: Option<String>,
    /// Override for the raw file host root.
    #[serde(default)]
    pub raw_base: Option<String>,
    /// Optional API token, raises the anonymous rate limit.
    #[serde(default)]
    pub token: Option<String>,
}

impl std::fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("pack_prefix", &self.pack_prefix)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("parallelism", &self.parallelism)
            .field("max_retries", &self.max_retries)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("api_base", &self.api_base)
            .field("raw_base", &self.raw_base)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

fn default_owner() -> String {
    "BLGardner".to_string()
}
fn default_repo() -> String {
    "aiq-x".to_string()
}
fn default_branch() -> String {
    "main".to_string()
}
fn default_pack_prefix() -> String {
    "Test-Packs/".to_string()
}
fn default_cache_ttl() -> u64 {
    600
}
fn default_parallelism() -> usize {
    4
}
fn default_retries() -> u32 {
    2
}
fn default_retry_delay() -> u64 {
    1000
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            repo: default_repo(),
            branch: default_branch(),
            pack_prefix: default_pack_prefix(),
            cache_ttl_secs: default_cache_ttl(),
            parallelism: default_parallelism(),
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            api_base: None,
            raw_base: None,
            token: None,
        }
    }
}

/// Top-level aiqx configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiqxConfig {
    /// Directory holding the persisted workspace.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Tier selected when none has been saved.
    #[serde(default)]
    pub default_tier: TierName,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./aiqx-data")
}

impl Default for AiqxConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            default_tier: TierName::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
/// Unset variables resolve to the empty string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let var_name = &rest[start + 2..start + len];
        result.push_str(&rest[..start]);
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + len + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_opt(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(resolve_env_vars)
        .filter(|v| !v.is_empty())
}

fn resolve_config(config: AiqxConfig) -> AiqxConfig {
    let catalog = &config.catalog;
    AiqxConfig {
        data_dir: PathBuf::from(resolve_env_vars(&config.data_dir.to_string_lossy())),
        default_tier: config.default_tier,
        catalog: CatalogConfig {
            owner: resolve_env_vars(&catalog.owner),
            repo: resolve_env_vars(&catalog.repo),
            branch: resolve_env_vars(&catalog.branch),
            pack_prefix: resolve_env_vars(&catalog.pack_prefix),
            api_base: resolve_opt(&catalog.api_base),
            raw_base: resolve_opt(&catalog.raw_base),
            token: resolve_opt(&catalog.token),
            ..catalog.clone()
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `aiqx.toml` in the current directory
/// 2. `~/.config/aiqx/config.toml`
///
/// Environment variable overrides: `AIQX_DATA_DIR`, `AIQX_GITHUB_TOKEN`.
pub fn load_config() -> Result<AiqxConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<AiqxConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("aiqx.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config file");
            toml::from_str::<AiqxConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => AiqxConfig::default(),
    };

    let mut config = resolve_config(config);

    // Apply env var overrides
    if let Ok(dir) = std::env::var("AIQX_DATA_DIR") {
        if !dir.is_empty() {
            config.data_dir = PathBuf::from(dir);
        }
    }
    if let Ok(token) = std::env::var("AIQX_GITHUB_TOKEN") {
        if !token.is_empty() {
            config.catalog.token = Some(token);
        }
    }

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("aiqx"))
}
