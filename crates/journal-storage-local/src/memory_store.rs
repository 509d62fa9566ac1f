use dashmap::DashMap;
use journal_storage_core::StorageError;

use crate::store::DeviceStore;

/// In-process device store with an optional byte quota.
///
/// The quota counts key and value bytes across all entries, like a browser
/// storage area. Writes that would exceed it fail with `StorageError::Write`.
/// The check is not atomic across concurrent writers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that refuses writes past `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: DashMap::new(),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Bytes currently used by keys and values.
    pub fn used_bytes(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| entry.key().len() + entry.value().len())
            .sum()
    }
}

impl DeviceStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(quota) = self.quota_bytes {
            let replaced = self
                .entries
                .get(key)
                .map(|v| key.len() + v.value().len())
                .unwrap_or(0);
            let needed = self.used_bytes().saturating_sub(replaced) + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::Write(format!(
                    "quota exceeded: {} bytes needed, {} allowed",
                    needed, quota
                )));
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.entries.iter().map(|e| e.key().clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_enforced() {
        let store = MemoryStore::with_quota(10);
        store.set_item("k", "12345").unwrap();
        assert_eq!(store.used_bytes(), 6);

        let err = store.set_item("k2", "123456789").unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
        assert_eq!(store.get_item("k2").unwrap(), None);
    }

    #[test]
    fn test_overwrite_counts_replaced_bytes() {
        let store = MemoryStore::with_quota(10);
        store.set_item("k", "123456789").unwrap();
        // Same size replacement fits even though the store is full
        store.set_item("k", "987654321").unwrap();
        assert_eq!(store.get_item("k").unwrap().as_deref(), Some("987654321"));
    }
}
