//! Validated runtime configuration.

use hookstorm_core::lifecycle::LifecycleSettings;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Configuration after file loading, CLI overrides and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    pub api_base_url: Url,
    pub request_timeout: Duration,
    pub endpoint_name: String,
    pub endpoint_ttl: Option<Duration>,
    pub poll_interval: Duration,
    pub storage_dir: PathBuf,
}

impl WatchConfig {
    pub fn lifecycle_settings(&self) -> LifecycleSettings {
        LifecycleSettings {
            endpoint_name: self.endpoint_name.clone(),
            ttl: self.endpoint_ttl,
        }
    }
}
