//! Configuration module for hookstorm-watch.
//!
//! Loads the TOML file, applies command line overrides and validates the
//! result into a [`WatchConfig`].

pub mod file;
pub mod runtime;

use crate::config::file::FileConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub use runtime::WatchConfig;

/// Read when no `--config` is given, if it exists.
pub const DEFAULT_CONFIG_PATH: &str = "./hookstorm.toml";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Values given on the command line; they win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_url: Option<Url>,
    pub storage_dir: Option<PathBuf>,
    pub interval_ms: Option<u64>,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    overrides: Overrides,
}

impl ConfigLoader {
    /// Create a new config loader.
    ///
    /// An explicit `config_path` must exist. Without one,
    /// [`DEFAULT_CONFIG_PATH`] is used when present and built-in defaults
    /// otherwise.
    pub fn new(config_path: Option<impl AsRef<Path>>, overrides: Overrides) -> Self {
        Self {
            config_path: config_path.map(|p| p.as_ref().to_path_buf()),
            overrides,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file, if any
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    pub fn load(&self) -> Result<WatchConfig, ConfigError> {
        let mut file_config = match self.source() {
            Some(path) => {
                let content = std::fs::read_to_string(&path)?;
                tracing::debug!(path = %path.display(), "Read configuration file");
                toml::from_str(&content)?
            }
            None => FileConfig::default(),
        };

        if let Some(api_url) = &self.overrides.api_url {
            file_config.api.base_url = api_url.clone();
        }
        if let Some(dir) = &self.overrides.storage_dir {
            file_config.storage.dir = dir.clone();
        }
        if let Some(interval_ms) = self.overrides.interval_ms {
            file_config.poller.interval_ms = interval_ms;
        }

        self.validate(&file_config)?;
        Ok(build_watch_config(file_config))
    }

    fn source(&self) -> Option<PathBuf> {
        match &self.config_path {
            Some(path) => Some(path.clone()),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                default.exists().then_some(default)
            }
        }
    }

    fn validate(&self, config: &FileConfig) -> Result<(), ConfigError> {
        let base_url = &config.api.base_url;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.host_str().is_none() {
            return Err(ConfigError::ValidationError(format!(
                "api.base_url must be an http(s) URL with a host, got {base_url}"
            )));
        }
        if config.api.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "api.timeout_secs must be greater than zero".to_owned(),
            ));
        }
        if config.endpoint.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "endpoint.name must not be empty".to_owned(),
            ));
        }
        if config.endpoint.ttl_secs == Some(0) {
            return Err(ConfigError::ValidationError(
                "endpoint.ttl_secs must be greater than zero".to_owned(),
            ));
        }
        if config.poller.interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "poller.interval_ms must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }
}

fn build_watch_config(file_config: FileConfig) -> WatchConfig {
    WatchConfig {
        api_base_url: file_config.api.base_url,
        request_timeout: Duration::from_secs(file_config.api.timeout_secs),
        endpoint_name: file_config.endpoint.name,
        endpoint_ttl: file_config.endpoint.ttl_secs.map(Duration::from_secs),
        poll_interval: Duration::from_millis(file_config.poller.interval_ms),
        storage_dir: file_config.storage.dir,
    }
}
