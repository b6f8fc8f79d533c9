//! TOML file configuration structures.
//!
//! These structs directly map to the `hookstorm.toml` file format. Every
//! section and field is optional.

use hookstorm_core::lifecycle::DEFAULT_ENDPOINT_NAME;
use hookstorm_core::processors::DEFAULT_POLL_INTERVAL;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub api: ApiConfig,
    pub endpoint: EndpointConfig,
    pub poller: PollerConfig,
    pub storage: StorageConfig,
}

/// Backend connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the hookstorm API, e.g. "http://127.0.0.1:8080".
    pub base_url: Url,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: 30,
        }
    }
}

fn default_base_url() -> Url {
    "http://127.0.0.1:8080".parse().expect("valid default base url")
}

/// Parameters for newly created endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub name: String,
    /// Requested lifetime; the backend default applies when unset.
    pub ttl_secs: Option<u64>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_ENDPOINT_NAME.to_owned(),
            ttl_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    pub interval_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

/// Where the current endpoint is remembered between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".hookstorm"),
        }
    }
}
