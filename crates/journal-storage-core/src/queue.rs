use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of operation held in the sync queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOp {
    #[default]
    Set,
    Remove,
    Clear,
}

impl WriteOp {
    pub fn is_set(&self) -> bool {
        matches!(self, WriteOp::Set)
    }
}

/// A write that succeeded locally but is not yet confirmed by the remote store.
///
/// Sets serialize as `{"key", "value", "enqueuedAt"}`; deletes carry an extra
/// `"op"` field and a `null` value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedWrite {
    pub key: String,
    #[serde(default)]
    pub value: Value,
    pub enqueued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "WriteOp::is_set")]
    pub op: WriteOp,
}

impl QueuedWrite {
    /// A pending `set(key, value)`.
    pub fn set(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
            enqueued_at: Utc::now(),
            op: WriteOp::Set,
        }
    }

    /// A pending `remove(key)`.
    pub fn remove(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Value::Null,
            enqueued_at: Utc::now(),
            op: WriteOp::Remove,
        }
    }

    /// A pending `clear()`.
    pub fn clear() -> Self {
        Self {
            key: String::new(),
            value: Value::Null,
            enqueued_at: Utc::now(),
            op: WriteOp::Clear,
        }
    }
}

/// Outcome of draining the sync queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Entries applied to the remote store during this drain.
    pub synced: usize,
    /// Entries still pending afterwards.
    pub remaining: usize,
    /// Key of the entry that stopped the drain, if it stopped early.
    pub halted_on: Option<String>,
}

impl SyncReport {
    /// Whether the queue was fully drained.
    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }
}
