use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use journal_storage_core::{QueuedWrite, StorageError, WriteOp, SYNC_QUEUE_KEY};
use journal_storage_local::{DeviceStore, LocalStorage};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

/// Durable FIFO of writes waiting for the remote store.
///
/// The in-memory list is the working copy; it is persisted as a JSON array
/// under the reserved [`SYNC_QUEUE_KEY`] in the local device store after
/// every change.
pub struct SyncQueue {
    store: Arc<dyn DeviceStore>,
    entries: Mutex<VecDeque<QueuedWrite>>,
    /// Serializes persistence so an older snapshot never overwrites a newer one.
    persist_lock: AsyncMutex<()>,
}

impl SyncQueue {
    /// Load the persisted queue from the device store behind `local`.
    ///
    /// A corrupt persisted queue is logged and replaced by an empty one.
    pub async fn load(local: &LocalStorage) -> Result<Self, StorageError> {
        let store = local.store().clone();
        let entries = match store.get_item(SYNC_QUEUE_KEY)? {
            Some(text) => match serde_json::from_str::<Vec<QueuedWrite>>(&text) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Discarding unreadable sync queue: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        if !entries.is_empty() {
            debug!("Loaded {} pending writes", entries.len());
        }

        Ok(Self {
            store,
            entries: Mutex::new(entries.into()),
            persist_lock: AsyncMutex::new(()),
        })
    }

    fn entries(&self) -> MutexGuard<'_, VecDeque<QueuedWrite>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Copy of the pending writes, oldest first.
    pub fn snapshot(&self) -> Vec<QueuedWrite> {
        self.entries().iter().cloned().collect()
    }

    /// Oldest pending write, left in place.
    pub fn front(&self) -> Option<QueuedWrite> {
        self.entries().front().cloned()
    }

    /// Whether `key` has a pending operation, a pending clear included.
    pub fn has_pending(&self, key: &str) -> bool {
        self.entries()
            .iter()
            .any(|w| w.op == WriteOp::Clear || w.key == key)
    }

    pub fn has_pending_clear(&self) -> bool {
        self.entries().iter().any(|w| w.op == WriteOp::Clear)
    }

    /// Latest pending operation per key.
    pub fn latest_ops(&self) -> HashMap<String, WriteOp> {
        let mut ops = HashMap::new();
        for write in self.entries().iter() {
            if write.op != WriteOp::Clear {
                ops.insert(write.key.clone(), write.op);
            }
        }
        ops
    }

    /// Append a write and persist the queue.
    pub async fn enqueue(&self, write: QueuedWrite) -> Result<(), StorageError> {
        debug!("Queued {:?} for {}", write.op, write.key);
        self.entries().push_back(write);
        self.persist().await
    }

    /// Drop the oldest write after it was applied remotely, then persist.
    pub async fn pop_front(&self) -> Result<Option<QueuedWrite>, StorageError> {
        let popped = self.entries().pop_front();
        self.persist().await?;
        Ok(popped)
    }

    /// Rewrite the persisted copy from the current in-memory list.
    pub async fn persist(&self) -> Result<(), StorageError> {
        let _guard = self.persist_lock.lock().await;
        let snapshot = serde_json::to_string(&self.snapshot())?;
        self.store.set_item(SYNC_QUEUE_KEY, &snapshot)
    }
}
