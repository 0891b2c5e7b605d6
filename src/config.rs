//! Configuration loading
//!
//! Settings are read from a TOML file; every section and field has a default,
//! so a missing file yields a working configuration (minus the API key).

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::cache::MAX_RETENTION_DAYS;
use crate::data::SortBy;
use crate::news::MAX_LOOKBACK_DAYS;

/// Environment variable that overrides `api.api_key`
pub const API_KEY_ENV: &str = "NEWS_API_KEY";

const CONFIG_FILE_NAME: &str = "portal-noticias.toml";

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub feed: FeedConfig,
    pub cache: CacheConfig,
    pub connectivity: ConnectivityConfig,
}

/// News API endpoint and credentials
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,
    /// Two-letter language filter sent with every request
    pub language: String,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://newsapi.org/v2".to_string(),
            api_key: String::new(),
            language: "pt".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// Pagination and query defaults for feed sessions
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub page_size: u32,
    /// Maximum number of pages walked for a single query
    pub max_pages: u32,
    /// Search term used when no category keyword or text is set
    pub default_query: String,
    /// How many days back the `from` filter reaches
    pub lookback_days: i64,
    pub sort_by: SortBy,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            max_pages: 5,
            default_query: "brasil".to_string(),
            lookback_days: 7,
            sort_by: SortBy::PublishedAt,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Prefix of every storage key owned by this application
    pub namespace: String,
    pub retention_days: i64,
    /// Storage file; defaults to the platform data directory
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: "@portal-noticias".to_string(),
            retention_days: 7,
            path: None,
        }
    }
}

impl CacheConfig {
    /// Resolves the storage file, falling back to the XDG data directory
    pub fn store_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.path {
            return Some(path.clone());
        }
        project_dirs().map(|dirs| dirs.data_dir().join("store.json"))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    pub probe_url: String,
    pub timeout_secs: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_url: "https://clients3.google.com/generate_204".to_string(),
            timeout_secs: 3,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "portal-noticias")
}

impl Config {
    /// Load configuration from file.
    ///
    /// Search order:
    /// 1. Explicit path if provided (must exist)
    /// 2. ./portal-noticias.toml (current directory)
    /// 3. $XDG_CONFIG_HOME/portal-noticias/config.toml
    ///
    /// Falls back to defaults when no file is found. `NEWS_API_KEY` always
    /// wins over the file's `api.api_key`.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit_path {
            Some(p) if p.exists() => Some(p.to_path_buf()),
            Some(p) => return Err(ConfigError::NotFound(p.to_path_buf())),
            None => Self::find_config_file(),
        };

        let mut config = match path {
            Some(p) => Self::load_from_path(&p)?,
            None => {
                debug!("no config file found, using defaults");
                Self::default()
            }
        };

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                config.api.api_key = key.trim().to_string();
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn find_config_file() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }

        let xdg_path = project_dirs()?.config_dir().join("config.toml");
        xdg_path.exists().then_some(xdg_path)
    }

    /// Parses a config file without applying environment overrides
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed.page_size == 0 {
            return Err(ConfigError::Invalid("feed.page_size must be at least 1".into()));
        }
        if self.feed.max_pages == 0 {
            return Err(ConfigError::Invalid("feed.max_pages must be at least 1".into()));
        }
        if !(0..=MAX_LOOKBACK_DAYS).contains(&self.feed.lookback_days) {
            return Err(ConfigError::Invalid(format!(
                "feed.lookback_days must be between 0 and {}",
                MAX_LOOKBACK_DAYS
            )));
        }
        if !(1..=MAX_RETENTION_DAYS).contains(&self.cache.retention_days) {
            return Err(ConfigError::Invalid(format!(
                "cache.retention_days must be between 1 and {}",
                MAX_RETENTION_DAYS
            )));
        }
        if self.api.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "api.request_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
