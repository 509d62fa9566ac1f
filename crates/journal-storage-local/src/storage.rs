use std::sync::Arc;

use async_trait::async_trait;
use journal_storage_core::{is_reserved_key, KeyValueBackend, StorageError};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::memory_store::MemoryStore;
use crate::store::DeviceStore;

/// Physical key written and deleted by the health probe. Reserved, so never listed.
const HEALTH_SENTINEL_KEY: &str = "__journal_health__";

/// Local backend: the key-value contract over a device store.
///
/// Every logical key is stored under `{namespace}{key}`. Listing and clearing
/// only see keys inside the namespace, and never touch reserved keys
/// (`__journal_*`), so the sync queue and other application data sharing the
/// same device store are left alone. Writes to a reserved physical key fail
/// with `StorageError::Config`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    store: Arc<dyn DeviceStore>,
    namespace: String,
}

impl LocalStorage {
    /// Create a local backend over `store`, scoped to `namespace`.
    pub fn new(store: Arc<dyn DeviceStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    /// Local backend over a fresh in-memory store.
    pub fn in_memory(namespace: impl Into<String>) -> Self {
        Self::new(Arc::new(MemoryStore::new()), namespace)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn store(&self) -> &Arc<dyn DeviceStore> {
        &self.store
    }

    fn physical_key(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    /// Physical key for a write, refusing keys that land in the reserved range.
    fn writable_key(&self, key: &str) -> Result<String, StorageError> {
        let physical = self.physical_key(key);
        if is_reserved_key(&physical) {
            return Err(StorageError::Config(format!(
                "key {} is reserved for the storage layer",
                physical
            )));
        }
        Ok(physical)
    }

    /// Logical keys inside this namespace, reserved keys excluded.
    fn namespace_keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self
            .store
            .keys()?
            .into_iter()
            .filter(|k| !is_reserved_key(k))
            .filter_map(|k| k.strip_prefix(self.namespace.as_str()).map(str::to_string))
            .collect())
    }
}

#[async_trait]
impl KeyValueBackend for LocalStorage {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let physical = self.physical_key(key);
        let Some(text) = self.store.get_item(&physical)? else {
            return Ok(None);
        };

        match serde_json::from_str(&text) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("Corrupt local record {}, treating as absent: {}", physical, e);
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, value), level = "debug")]
    async fn set(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let physical = self.writable_key(key)?;
        let text = serde_json::to_string(value)?;
        self.store.set_item(&physical, &text)?;
        debug!("Local SET {} ({} bytes)", physical, text.len());
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.store.remove_item(&self.writable_key(key)?)
    }

    #[instrument(skip(self), level = "debug")]
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let keys: Vec<String> = self
            .namespace_keys()?
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect();
        debug!("Listed {} local keys with prefix {:?}", keys.len(), prefix);
        Ok(keys)
    }

    #[instrument(skip(self), level = "debug")]
    async fn clear(&self) -> Result<(), StorageError> {
        let keys = self.namespace_keys()?;
        for key in &keys {
            self.store.remove_item(&self.physical_key(key))?;
        }
        debug!("Cleared {} local keys", keys.len());
        Ok(())
    }

    async fn health_check(&self) -> bool {
        let probe = self
            .store
            .set_item(HEALTH_SENTINEL_KEY, "true")
            .and_then(|()| self.store.remove_item(HEALTH_SENTINEL_KEY));

        match probe {
            Ok(()) => true,
            Err(e) => {
                warn!("Local storage health check failed: {}", e);
                false
            }
        }
    }
}
