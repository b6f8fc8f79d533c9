//! Client-local persistence.
//!
//! The lifecycle keeps exactly one record here: the last endpoint it
//! created or verified, serialized as JSON under [`ENDPOINT_STORAGE_KEY`].
//! The stored copy can be stale and is always re-verified before use.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use hookstorm_sdk::objects::Endpoint;
use std::sync::Arc;
use thiserror::Error;

/// Storage key of the persisted endpoint.
pub const ENDPOINT_STORAGE_KEY: &str = "webhookEndpoint";

/// Errors raised by a [`KeyValueStore`] or while decoding its contents.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored value is not a valid serialized record.
    #[error("stored value is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// String key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Typed accessor for the persisted endpoint record.
#[derive(Clone)]
pub struct PersistedEndpoint {
    store: Arc<dyn KeyValueStore>,
}

impl PersistedEndpoint {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Read the stored endpoint.
    ///
    /// Returns [`StorageError::Corrupt`] if something is stored but does
    /// not parse.
    pub async fn load(&self) -> Result<Option<Endpoint>, StorageError> {
        match self.store.get(ENDPOINT_STORAGE_KEY).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn save(&self, endpoint: &Endpoint) -> Result<(), StorageError> {
        let raw = serde_json::to_string(endpoint)?;
        self.store.set(ENDPOINT_STORAGE_KEY, &raw).await
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(ENDPOINT_STORAGE_KEY).await
    }

    /// Remove the record only while it still holds endpoint `id`.
    ///
    /// A corrupt record is removed as well. Returns whether anything was
    /// removed.
    pub async fn clear_if(&self, id: &str) -> Result<bool, StorageError> {
        let matches = match self.load().await {
            Ok(Some(stored)) => stored.id == id,
            Ok(None) => false,
            Err(StorageError::Corrupt(_)) => true,
            Err(e) => return Err(e),
        };
        if matches {
            self.clear().await?;
        }
        Ok(matches)
    }
}
