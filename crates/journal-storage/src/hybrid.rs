//! Local-first backend with remote sync.
//!
//! Local is the durability anchor: every write lands there first and only a
//! local failure is ever surfaced. Remote is preferred for reads while it is
//! reachable. Remote writes that cannot be applied go to the [`SyncQueue`] and
//! are replayed in order by [`HybridStorage::process_sync_queue`].

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use journal_storage_core::{KeyValueBackend, QueuedWrite, StorageError, SyncReport, WriteOp};
use journal_storage_local::LocalStorage;
use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, instrument, warn};

use crate::queue::SyncQueue;

pub struct HybridStorage {
    local: LocalStorage,
    remote: Arc<dyn KeyValueBackend>,
    queue: SyncQueue,
    /// One drain at a time, so at most one replayed write is in flight.
    drain_lock: AsyncMutex<()>,
}

impl HybridStorage {
    /// Compose `local` and `remote`, restoring any sync queue persisted in
    /// `local`'s device store.
    pub async fn open(
        local: LocalStorage,
        remote: Arc<dyn KeyValueBackend>,
    ) -> Result<Self, StorageError> {
        let queue = SyncQueue::load(&local).await?;
        if !queue.is_empty() {
            info!("Restored {} pending remote writes", queue.len());
        }
        Ok(Self {
            local,
            remote,
            queue,
            drain_lock: AsyncMutex::new(()),
        })
    }

    pub fn local(&self) -> &LocalStorage {
        &self.local
    }

    pub fn remote(&self) -> &Arc<dyn KeyValueBackend> {
        &self.remote
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Writes not yet confirmed by the remote store, oldest first.
    pub fn pending_writes(&self) -> Vec<QueuedWrite> {
        self.queue.snapshot()
    }

    async fn apply_remote(&self, write: &QueuedWrite) -> Result<(), StorageError> {
        match write.op {
            WriteOp::Set => self.remote.set(&write.key, &write.value).await,
            WriteOp::Remove => self.remote.remove(&write.key).await,
            WriteOp::Clear => self.remote.clear().await,
        }
    }

    async fn defer(&self, write: QueuedWrite) {
        let key = write.key.clone();
        // The in-memory entry is kept even if persisting it fails.
        if let Err(e) = self.queue.enqueue(write).await {
            warn!("Failed to persist sync queue after queuing {}: {}", key, e);
        }
    }

    /// Mirror a locally applied write to the remote store, or queue it.
    async fn mirror(&self, write: QueuedWrite) {
        if !self.queue.is_empty() {
            debug!("{} writes pending, queuing {:?} for {}", self.queue.len(), write.op, write.key);
            self.defer(write).await;
            return;
        }

        if !self.remote.health_check().await {
            debug!("Remote unhealthy, queuing {:?} for {}", write.op, write.key);
            self.defer(write).await;
            return;
        }

        match self.apply_remote(&write).await {
            Ok(()) => debug!("Mirrored {:?} for {} to remote", write.op, write.key),
            Err(e) => {
                warn!("Remote {:?} for {} failed, queuing: {}", write.op, write.key, e);
                self.defer(write).await;
            }
        }
    }

    /// Replay queued writes against the remote store, oldest first.
    ///
    /// Stops at the first failure and leaves that write at the head of the
    /// queue; later writes are not attempted. Never self-scheduled: callers
    /// decide when to drain (on reconnect, on a timer, with backoff).
    #[instrument(skip(self), level = "debug")]
    pub async fn process_sync_queue(&self) -> SyncReport {
        let _guard = self.drain_lock.lock().await;
        let mut report = SyncReport::default();

        let Some(head) = self.queue.front() else {
            return report;
        };

        if !self.remote.health_check().await {
            debug!("Remote unhealthy, not draining {} writes", self.queue.len());
            report.remaining = self.queue.len();
            report.halted_on = Some(head.key);
            return report;
        }

        while let Some(write) = self.queue.front() {
            if let Err(e) = self.apply_remote(&write).await {
                warn!(
                    "Sync of {:?} for {} failed, halting drain: {}",
                    write.op, write.key, e
                );
                if let Err(e) = self.queue.persist().await {
                    warn!("Failed to persist sync queue: {}", e);
                }
                report.halted_on = Some(write.key);
                break;
            }

            if let Err(e) = self.queue.pop_front().await {
                warn!("Failed to persist sync queue after syncing {}: {}", write.key, e);
            }
            report.synced += 1;
        }

        report.remaining = self.queue.len();
        info!(
            synced = report.synced,
            remaining = report.remaining,
            "Processed sync queue"
        );
        report
    }
}

#[async_trait]
impl KeyValueBackend for HybridStorage {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        // Queued writes are newer than anything the remote store holds.
        if self.queue.has_pending(key) {
            debug!("{} has pending writes, reading local", key);
            return self.local.get(key).await;
        }

        if self.remote.health_check().await {
            match self.remote.get(key).await {
                Ok(Some(value)) => {
                    if let Err(e) = self.local.set(key, &value).await {
                        warn!("Failed to cache remote value for {}: {}", key, e);
                    }
                    return Ok(Some(value));
                }
                Ok(None) => debug!("{} absent remotely, falling back to local", key),
                Err(e) => warn!("Remote GET {} failed, falling back to local: {}", key, e),
            }
        }

        self.local.get(key).await
    }

    #[instrument(skip(self, value), level = "debug")]
    async fn set(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        self.local.set(key, value).await?;
        self.mirror(QueuedWrite::set(key, value.clone())).await;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.local.remove(key).await?;
        self.mirror(QueuedWrite::remove(key)).await;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        if self.queue.has_pending_clear() || !self.remote.health_check().await {
            return self.local.list_keys(prefix).await;
        }

        let remote_keys = match self.remote.list_keys(prefix).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Remote key listing failed, falling back to local: {}", e);
                return self.local.list_keys(prefix).await;
            }
        };

        let mut keys: BTreeSet<String> = remote_keys.into_iter().collect();
        for (key, op) in self.queue.latest_ops() {
            if !key.starts_with(prefix) {
                continue;
            }
            match op {
                WriteOp::Set => {
                    keys.insert(key);
                }
                WriteOp::Remove => {
                    keys.remove(&key);
                }
                WriteOp::Clear => {}
            }
        }
        Ok(keys.into_iter().collect())
    }

    #[instrument(skip(self), level = "debug")]
    async fn clear(&self) -> Result<(), StorageError> {
        self.local.clear().await?;
        self.mirror(QueuedWrite::clear()).await;
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.local.health_check().await || self.remote.health_check().await
    }
}
