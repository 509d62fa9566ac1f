//! One-time choice of the process-wide storage backend.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use journal_storage_core::{KeyValueBackend, QueuedWrite, StorageError, SyncReport};
use journal_storage_d1::{PrincipalProvider, RemoteConfig, RemoteStorage};
use journal_storage_local::{DeviceStore, FileStore, LocalStorage, MemoryStore};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::hybrid::HybridStorage;

/// Where the local tier keeps its data.
#[derive(Debug, Clone)]
pub enum LocalStoreConfig {
    Directory(PathBuf),
    Memory,
}

/// Inputs to backend selection, read once at startup.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub use_remote: bool,
    pub enable_sync: bool,
    /// Key prefix for application records in the local store
    pub namespace: String,
    pub local: LocalStoreConfig,
    /// Present only when remote credentials are configured
    pub remote: Option<RemoteConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Local,
    Remote,
    Hybrid,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Local => "local",
            BackendKind::Remote => "remote",
            BackendKind::Hybrid => "hybrid",
        };
        f.write_str(name)
    }
}

impl StorageConfig {
    /// Decide which backend this configuration selects.
    ///
    /// `use_remote` wins over `enable_sync`; both need remote configuration,
    /// otherwise the local backend is used.
    pub fn backend_kind(&self) -> BackendKind {
        match (&self.remote, self.use_remote, self.enable_sync) {
            (Some(_), true, _) => BackendKind::Remote,
            (Some(_), false, true) => BackendKind::Hybrid,
            _ => BackendKind::Local,
        }
    }

    fn open_local(&self) -> Result<LocalStorage, StorageError> {
        let store: Arc<dyn DeviceStore> = match &self.local {
            LocalStoreConfig::Directory(dir) => Arc::new(FileStore::open(dir)?),
            LocalStoreConfig::Memory => Arc::new(MemoryStore::new()),
        };
        Ok(LocalStorage::new(store, self.namespace.clone()))
    }
}

/// The storage handle the rest of the application depends on.
///
/// Built once by [`select_backend`] and passed explicitly to consumers
/// (typically as `Arc<Backend>`); it is never swapped at runtime.
pub enum Backend {
    Local(LocalStorage),
    Remote(RemoteStorage),
    Hybrid(HybridStorage),
}

impl Backend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Local(_) => BackendKind::Local,
            Backend::Remote(_) => BackendKind::Remote,
            Backend::Hybrid(_) => BackendKind::Hybrid,
        }
    }

    /// Drain the sync queue. Only the hybrid backend has one; the others
    /// report an empty drain.
    pub async fn process_sync_queue(&self) -> SyncReport {
        match self {
            Backend::Hybrid(hybrid) => hybrid.process_sync_queue().await,
            _ => SyncReport::default(),
        }
    }

    /// Writes waiting for the remote store (hybrid only).
    pub fn pending_writes(&self) -> Vec<QueuedWrite> {
        match self {
            Backend::Hybrid(hybrid) => hybrid.pending_writes(),
            _ => Vec::new(),
        }
    }

    fn inner(&self) -> &dyn KeyValueBackend {
        match self {
            Backend::Local(local) => local,
            Backend::Remote(remote) => remote,
            Backend::Hybrid(hybrid) => hybrid,
        }
    }
}

#[async_trait]
impl KeyValueBackend for Backend {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        self.inner().get(key).await
    }

    async fn set(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        self.inner().set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner().remove(key).await
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.inner().list_keys(prefix).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.inner().clear().await
    }

    async fn health_check(&self) -> bool {
        self.inner().health_check().await
    }
}

/// Build the backend selected by `config`.
///
/// `principal` scopes every remote operation; it is only consulted when a
/// remote tier is selected.
pub async fn select_backend(
    config: &StorageConfig,
    principal: Arc<dyn PrincipalProvider>,
) -> Result<Backend, StorageError> {
    let kind = config.backend_kind();
    let backend = match (kind, &config.remote) {
        (BackendKind::Remote, Some(remote)) => {
            Backend::Remote(RemoteStorage::new(remote, principal)?)
        }
        (BackendKind::Hybrid, Some(remote)) => {
            let remote: Arc<dyn KeyValueBackend> = Arc::new(RemoteStorage::new(remote, principal)?);
            Backend::Hybrid(HybridStorage::open(config.open_local()?, remote).await?)
        }
        _ => Backend::Local(config.open_local()?),
    };

    info!("Selected {} storage backend", backend.kind());
    Ok(backend)
}
