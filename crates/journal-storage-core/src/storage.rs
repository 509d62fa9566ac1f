use async_trait::async_trait;
use serde_json::Value;

use crate::error::StorageError;

/// Physical key prefix reserved for the storage layer's own bookkeeping.
///
/// Keys under this prefix are never listed or cleared through the contract,
/// whatever namespace a backend is configured with.
pub const RESERVED_PREFIX: &str = "__journal_";

/// Physical key under which the sync queue is persisted in the local store.
pub const SYNC_QUEUE_KEY: &str = "__journal_sync__queue";

/// Whether a physical key belongs to the storage layer rather than the application.
pub fn is_reserved_key(key: &str) -> bool {
    key.starts_with(RESERVED_PREFIX)
}

/// Uniform key-value contract implemented by every backend.
///
/// Values are opaque JSON documents; backends never inspect their shape.
/// Every operation may suspend on I/O.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Get the value stored under `key`.
    ///
    /// Returns `Ok(None)` when the record does not exist. A stored JSON `null`
    /// is returned as `Ok(Some(Value::Null))`.
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &Value) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// List keys starting with `prefix`. An empty prefix lists every key the
    /// backend manages.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Remove every key the backend manages, leaving unrelated data untouched.
    async fn clear(&self) -> Result<(), StorageError>;

    /// Non-destructive liveness probe. Never fails; returns `false` when the
    /// backend is unusable.
    async fn health_check(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_keys() {
        assert!(is_reserved_key(SYNC_QUEUE_KEY));
        assert!(is_reserved_key("__journal_health"));
        assert!(!is_reserved_key("app_mood_2024-01-01"));
        assert!(!is_reserved_key("__other"));
    }
}
