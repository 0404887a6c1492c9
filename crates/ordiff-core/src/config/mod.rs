//! Configuration management for ordiff.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `ordiff.toml` file
//! 3. User config `~/.config/ordiff/config.toml`
//! 4. Built-in defaults (lowest priority)
//!
//! The repository most recently indexed is persisted separately, see
//! [`RepoSettings`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

mod defaults;
mod settings;

pub use defaults::*;
pub use settings::RepoSettings;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Failed to read settings file: {0}")]
    SettingsError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote history source configuration.
    pub github: GitHubConfig,

    /// Local cache configuration.
    pub storage: StorageConfig,

    /// Indexing run configuration.
    pub index: IndexConfig,

    /// HTTP host configuration.
    pub serve: ServeConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./ordiff.toml` (project local)
    /// 2. `~/.config/ordiff/config.toml` (user config)
    /// 3. Falls back to defaults
    ///
    /// Environment overrides are applied in every case.
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new("ordiff.toml").exists() {
            return Self::from_file("ordiff.toml");
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("ordiff").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // GitHub overrides
        let token = std::env::var("ORDIFF_GITHUB_TOKEN").or_else(|_| std::env::var("GITHUB_TOKEN"));
        if let Ok(token) = token {
            if !token.is_empty() {
                self.github.token = Some(token);
            }
        }
        if let Ok(url) = std::env::var("ORDIFF_API_URL") {
            self.github.api_url = url;
        }
        if let Ok(per_page) = std::env::var("ORDIFF_PER_PAGE") {
            if let Ok(n) = per_page.parse() {
                self.github.per_page = n;
            }
        }

        // Storage overrides
        if let Ok(path) = std::env::var("ORDIFF_DB_PATH") {
            self.storage.db_path = path;
        }

        // Serve overrides
        if let Ok(port) = std::env::var("ORDIFF_SERVE_PORT") {
            if let Ok(n) = port.parse() {
                self.serve.port = n;
            }
        }
    }

    /// Checks values that would otherwise fail deep inside a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.github.per_page == 0 || self.github.per_page > DEFAULT_PER_PAGE {
            return Err(ConfigError::Invalid(format!(
                "github.per_page must be between 1 and {}, got {}",
                DEFAULT_PER_PAGE, self.github.per_page
            )));
        }
        self.index.validate()
    }

    /// Serializes the configuration as TOML. The token is never written.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Remote history source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// REST API base URL (GitHub Enterprise installs use `https://host/api/v3`).
    pub api_url: String,

    /// Access token. Anonymous access is heavily rate limited.
    #[serde(skip_serializing)]
    pub token: Option<String>,

    /// Items requested per page.
    pub per_page: u32,

    /// User-Agent header value.
    pub user_agent: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None, // Load from env
            per_page: DEFAULT_PER_PAGE,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Local cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file.
    pub db_path: String,

    /// YAML file holding the default repository.
    pub settings_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            settings_file: DEFAULT_SETTINGS_FILE.to_string(),
        }
    }
}

impl StorageConfig {
    /// Path to the SQLite database.
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.db_path)
    }

    /// Path to the default repository settings file.
    pub fn settings_path(&self) -> PathBuf {
        PathBuf::from(&self.settings_file)
    }
}

/// Indexing run configuration.
///
/// Progress is reported on a `0..=100` scale split into three bands:
/// fetching releases, persisting releases, processing release pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// End of the release-fetch band.
    pub fetch_band_end: u32,

    /// End of the release-persist band.
    pub persist_band_end: u32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            fetch_band_end: DEFAULT_FETCH_BAND_END,
            persist_band_end: DEFAULT_PERSIST_BAND_END,
        }
    }
}

impl IndexConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch_band_end > self.persist_band_end || self.persist_band_end >= PROGRESS_TOTAL {
            return Err(ConfigError::Invalid(format!(
                "index bands must satisfy fetch_band_end <= persist_band_end < {}, got {} and {}",
                PROGRESS_TOTAL, self.fetch_band_end, self.persist_band_end
            )));
        }
        Ok(())
    }
}

/// HTTP host configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Port to listen on (localhost only).
    pub port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERVE_PORT,
        }
    }
}
