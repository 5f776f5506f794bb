// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Storage port for JSON config blobs, plus the service that (de)serializes them.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Raw blob storage keyed by logical name.
///
/// Keys reaching a store have passed [`validate_key`], so adapters may use
/// them directly as file stems.
pub trait ConfigStore {
    /// Loads the blob stored under `key`, or `NotFound`.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Stores `data` under `key`, replacing any previous blob.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
    /// Every stored key, sorted.
    fn list_keys(&self) -> Result<Vec<String>, ConfigError>;
}

/// Failure loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Nothing stored under the key.
    #[error("no config stored under {0:?}")]
    NotFound(String),
    /// Key contains characters outside `[A-Za-z0-9._-]` or is empty.
    #[error("invalid config key {0:?}")]
    InvalidKey(String),
    /// Underlying storage failed.
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    /// Stored blob is not the expected JSON shape.
    #[error("config decode error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Adapter-specific failure.
    #[error("config store error: {0}")]
    Other(String),
}

/// Accepts non-empty keys made of ASCII alphanumerics, `.`, `_` and `-`,
/// not starting with a dot.
pub fn validate_key(key: &str) -> Result<(), ConfigError> {
    let well_formed = !key.is_empty()
        && !key.starts_with('.')
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'));
    if well_formed {
        Ok(())
    } else {
        Err(ConfigError::InvalidKey(key.to_owned()))
    }
}

/// JSON (de)serialization over a [`ConfigStore`].
#[derive(Debug)]
pub struct ConfigService<S> {
    store: S,
}

impl<S: ConfigStore> ConfigService<S> {
    /// Wraps `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Value stored under `key`; `Ok(None)` when absent or empty.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        validate_key(key)?;
        match self.store.load_raw(key) {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(ConfigError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Stores `value` under `key` as pretty JSON.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ConfigError> {
        validate_key(key)?;
        let data = serde_json::to_vec_pretty(value)?;
        self.store.save_raw(key, &data)
    }

    /// Stored keys starting with `prefix`, prefix stripped.
    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, ConfigError> {
        Ok(self
            .store
            .list_keys()?
            .into_iter()
            .filter_map(|k| k.strip_prefix(prefix).map(str::to_owned))
            .collect())
    }

    /// The wrapped store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

/// Process-local store. Nothing touches disk.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryConfigStore {
    fn blobs(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>>, ConfigError> {
        self.blobs
            .lock()
            .map_err(|_| ConfigError::Other("memory store lock poisoned".into()))
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        self.blobs()?
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::NotFound(key.to_owned()))
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        self.blobs()?.insert(key.to_owned(), data.to_vec());
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<String>, ConfigError> {
        Ok(self.blobs()?.keys().cloned().collect())
    }
}
