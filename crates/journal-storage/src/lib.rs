//! Local-first journal storage.
//!
//! Composes the local and remote backends behind the uniform
//! [`KeyValueBackend`] contract:
//! - [`HybridStorage`]: local-first reads and writes with a durable [`SyncQueue`]
//! - [`select_backend`]: one-time choice between local, remote and hybrid
//! - [`SyncBackoff`]: caller-side cadence for draining the queue

pub mod backoff;
pub mod config;
pub mod hybrid;
pub mod queue;
pub mod selector;

pub use backoff::SyncBackoff;
pub use config::Config;
pub use hybrid::HybridStorage;
pub use queue::SyncQueue;
pub use selector::{select_backend, Backend, BackendKind, LocalStoreConfig, StorageConfig};

pub use journal_storage_core::{KeyValueBackend, QueuedWrite, StorageError, SyncReport, WriteOp};
pub use journal_storage_d1::{Principal, PrincipalProvider, RemoteConfig, RemoteStorage, SessionPrincipal};
pub use journal_storage_local::{DeviceStore, FileStore, LocalStorage, MemoryStore};
