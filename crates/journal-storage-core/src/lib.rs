//! Core contract and types for journal storage backends.
//!
//! This crate defines the abstractions shared between the local, remote and hybrid
//! storage implementations:
//! - `KeyValueBackend`: the uniform key-value contract every backend implements
//! - `StorageError`: the error taxonomy shared by all backends
//! - `QueuedWrite` / `WriteOp`: pending remote writes held by the sync queue
//! - `SyncReport`: outcome of a sync queue drain

mod error;
mod queue;
mod storage;

pub use error::StorageError;
pub use queue::{QueuedWrite, SyncReport, WriteOp};
pub use storage::{is_reserved_key, KeyValueBackend, RESERVED_PREFIX, SYNC_QUEUE_KEY};
