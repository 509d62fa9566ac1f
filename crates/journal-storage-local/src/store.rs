use std::fmt::Debug;

use journal_storage_core::StorageError;

/// A synchronous, durable, device-local string store.
///
/// Keys here are physical keys: namespacing is applied by `LocalStorage`.
/// A single store may be shared by several `LocalStorage` instances.
pub trait DeviceStore: Send + Sync + Debug {
    /// Read the raw text stored under `key`.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write raw text under `key`. Fails with `StorageError::Write` when the
    /// store cannot persist it.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting an absent key succeeds.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// Every physical key currently in the store, in no particular order.
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}
