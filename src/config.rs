//! Configuration loading.
//!
//! A config file (TOML, YAML or JSON, picked by extension) is layered under
//! environment overrides. The override names are the ones the scheduled
//! deployment already sets (`WISHLIST_URLS`, `SECRET_NAME`, `AWS_REGION`,
//! `DATABASE_NAME`, `TABLE_NAME`).

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::extract::ItemPolicy;
use crate::repository::SinkTarget;
use crate::scrapers::{AcquireMode, BrowserEngineConfig, ScrollConfig};
use crate::secrets::SecretsConfig;

/// File stem looked up in the working directory.
pub const CONFIG_BASENAME: &str = "wishtrack";
const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {format} config {path}: {message}")]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },

    #[error("no wishlist URLs configured (set scrape.urls or WISHLIST_URLS)")]
    NoUrls,

    #[error("invalid wishlist URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("sink setting {0} is not configured")]
    MissingSink(&'static str),

    #[error("sink.batch_size must be at least 1")]
    ZeroBatchSize,
}

/// Acquisition and extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Wishlist pages, processed in order. Duplicates are kept.
    #[serde(default)]
    pub urls: Vec<String>,

    #[serde(default)]
    pub mode: AcquireMode,

    /// Fixed User-Agent, or "impersonate" to pick a current browser UA per run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    #[serde(default)]
    pub item_policy: ItemPolicy,

    #[serde(default)]
    pub scroll: ScrollConfig,
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            mode: AcquireMode::default(),
            user_agent: None,
            request_timeout: default_request_timeout(),
            item_policy: ItemPolicy::default(),
            scroll: ScrollConfig::default(),
        }
    }
}

impl ScrapeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Check that at least one URL is configured and that all of them parse.
    pub fn validate_urls(&self) -> Result<(), ConfigError> {
        if self.urls.is_empty() {
            return Err(ConfigError::NoUrls);
        }
        for raw in &self.urls {
            url::Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
                url: raw.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

/// Where the records go.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Name of the credential secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    /// Rows per INSERT statement.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Connect without TLS (local development databases).
    #[serde(default)]
    pub no_tls: bool,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            secret_name: None,
            region: None,
            database: None,
            table: None,
            batch_size: default_batch_size(),
            no_tls: false,
        }
    }
}

impl SinkConfig {
    /// Resolve into a complete write target, failing on the first missing name.
    pub fn target(&self) -> Result<SinkTarget, ConfigError> {
        fn required(value: &Option<String>, key: &'static str) -> Result<String, ConfigError> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or(ConfigError::MissingSink(key))
        }

        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }

        Ok(SinkTarget {
            secret_name: required(&self.secret_name, "secret_name")?,
            region: required(&self.region, "region")?,
            database: required(&self.database, "database")?,
            table: required(&self.table, "table")?,
            batch_size: self.batch_size,
            no_tls: self.no_tls,
        })
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scrape: ScrapeConfig,

    #[serde(default)]
    pub browser: BrowserEngineConfig,

    #[serde(default)]
    pub sink: SinkConfig,

    #[serde(default)]
    pub secrets: SecretsConfig,

    /// File this config was loaded from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load using the discovery order: explicit path, working directory,
    /// user config directory, defaults. Environment overrides are applied last.
    pub async fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match explicit {
            Some(path) => Self::load_from_path(path).await?,
            None => match discover_config_file() {
                Some(path) => {
                    tracing::debug!("Using config file {}", path.display());
                    Self::load_from_path(&path).await?
                }
                None => {
                    tracing::debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };
        Ok(config.with_env_overrides())
    }

    /// Load configuration from a specific file path.
    /// The format is chosen by extension; anything unrecognised is read as JSON.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let parse_error = |format: &'static str, message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            format,
            message,
        };

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents).map_err(|e| parse_error("TOML", e.to_string()))?,
            "yaml" | "yml" => {
                serde_yaml::from_str(&contents).map_err(|e| parse_error("YAML", e.to_string()))?
            }
            _ => serde_json::from_str(&contents).map_err(|e| parse_error("JSON", e.to_string()))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Apply environment variable overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source. Empty values are ignored.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(urls) = var("WISHLIST_URLS") {
            self.scrape.urls = split_urls(&urls);
        }
        if let Some(mode) = var("WISHTRACK_ACQUIRE_MODE") {
            match AcquireMode::from_str(mode.trim()) {
                Some(mode) => self.scrape.mode = mode,
                None => tracing::warn!("Ignoring unknown WISHTRACK_ACQUIRE_MODE {:?}", mode),
            }
        }
        if let Some(name) = var("SECRET_NAME") {
            self.sink.secret_name = Some(name);
        }
        if let Some(region) = var("AWS_REGION") {
            self.sink.region = Some(region);
        }
        if let Some(database) = var("DATABASE_NAME") {
            self.sink.database = Some(database);
        }
        if let Some(table) = var("TABLE_NAME") {
            self.sink.table = Some(table);
        }

        self
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Split a comma-separated URL list, trimming entries and dropping empties.
pub fn split_urls(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn discover_config_file() -> Option<PathBuf> {
    let cwd = env::current_dir().ok();
    let local = cwd.iter().flat_map(|dir| candidates(dir, CONFIG_BASENAME));
    let user = dirs::config_dir()
        .map(|dir| dir.join(CONFIG_BASENAME))
        .into_iter()
        .flat_map(|dir| candidates(&dir, "config"));

    local.chain(user).find(|path| path.is_file())
}

fn candidates(dir: &Path, stem: &str) -> Vec<PathBuf> {
    CONFIG_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", stem, ext)))
        .collect()
}
