//! Durable local persistence of the wishlist.
//!
//! The whole list is stored as one JSON array under a single key. Reads are
//! tolerant: a payload that does not parse is discarded and treated as an
//! empty wishlist.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use tracing::{error, warn};

use crate::error::StorageError;
use crate::models::WishlistItem;

/// String key/value backend, shaped like browser local storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Ephemeral backend for tests and hosts without a writable disk.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Reads and writes the serialized wishlist under a fixed key.
#[derive(Clone)]
pub struct WishlistStorage {
    backend: Arc<dyn KeyValueStore>,
    key: String,
}

impl WishlistStorage {
    pub fn new(backend: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the saved items.
    ///
    /// Never fails: a missing payload, an unreadable backend and a corrupt
    /// payload all yield an empty list. A corrupt payload is also removed.
    pub fn load(&self) -> Vec<WishlistItem> {
        match self.try_load() {
            Ok(items) => items,
            Err(err @ StorageError::Corrupt { .. }) => {
                warn!(key = %self.key, error = %err, "discarding corrupt wishlist payload");
                if let Err(clear_err) = self.clear() {
                    error!(key = %self.key, error = %clear_err, "failed to discard corrupt wishlist payload");
                }
                Vec::new()
            }
            Err(err) => {
                error!(key = %self.key, error = %err, "failed to read wishlist payload");
                Vec::new()
            }
        }
    }

    /// Load the saved items, surfacing corruption to the caller.
    pub fn try_load(&self) -> Result<Vec<WishlistItem>, StorageError> {
        let Some(payload) = self.backend.get(&self.key)? else {
            return Ok(Vec::new());
        };

        serde_json::from_str(&payload).map_err(|source| StorageError::Corrupt {
            key: self.key.clone(),
            source,
        })
    }

    /// Overwrite the payload with the full item list.
    pub fn save(&self, items: &[WishlistItem]) -> Result<(), StorageError> {
        let payload = serde_json::to_string(items).map_err(StorageError::Serialize)?;
        self.backend.set(&self.key, &payload)?;
        Ok(())
    }

    /// Remove the payload entirely.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.backend.remove(&self.key)?;
        Ok(())
    }

    /// Raw payload currently stored, if any.
    pub fn raw(&self) -> Result<Option<String>, StorageError> {
        Ok(self.backend.get(&self.key)?)
    }
}
