//! In-process remote store with switchable reachability and per-key faults.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use journal_storage::{KeyValueBackend, StorageError};
use serde_json::Value;

#[derive(Default)]
pub struct FakeRemote {
    records: Mutex<HashMap<String, Value>>,
    down: AtomicBool,
    failing_keys: Mutex<HashSet<String>>,
    applied: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FakeRemote {
    pub fn unreachable() -> Self {
        let remote = Self::default();
        remote.set_reachable(false);
        remote
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.down.store(!reachable, Ordering::SeqCst);
    }

    /// Make writes to `key` fail while the store stays otherwise healthy.
    pub fn fail_on(&self, key: &str) {
        self.failing_keys.lock().unwrap().insert(key.to_string());
    }

    pub fn heal(&self, key: &str) {
        self.failing_keys.lock().unwrap().remove(key);
    }

    /// Keys of successfully applied writes, in order.
    pub fn applied(&self) -> Vec<String> {
        self.applied.lock().unwrap().clone()
    }

    pub fn peek(&self, key: &str) -> Option<Value> {
        self.records.lock().unwrap().get(key).cloned()
    }

    pub fn seed(&self, key: &str, value: Value) {
        self.records.lock().unwrap().insert(key.to_string(), value);
    }

    fn check(&self, key: &str) -> Result<(), StorageError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StorageError::Network("remote down".into()));
        }
        if self.failing_keys.lock().unwrap().contains(key) {
            return Err(StorageError::Remote(format!("write to {} rejected", key)));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueBackend for FakeRemote {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StorageError::Network("remote down".into()));
        }
        Ok(self.peek(key))
    }

    async fn set(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        self.check(key)?;
        self.records
            .lock()
            .unwrap()
            .insert(key.to_string(), value.clone());
        self.applied.lock().unwrap().push(key.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check(key)?;
        self.records.lock().unwrap().remove(key);
        self.applied.lock().unwrap().push(format!("-{}", key));
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StorageError::Network("remote down".into()));
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.check("")?;
        self.records.lock().unwrap().clear();
        self.applied.lock().unwrap().push("*".to_string());
        Ok(())
    }

    async fn health_check(&self) -> bool {
        !self.down.load(Ordering::SeqCst)
    }
}
