use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use journal_storage_d1::{Principal, RemoteConfig};
use journal_storage_local::FileStore;

use crate::selector::{LocalStoreConfig, StorageConfig};

/// Storage configuration, read once at process start.
#[derive(Args, Debug, Clone)]
pub struct Config {
    /// Directory for the local store (defaults to the platform data directory)
    #[arg(long, env = "JOURNAL_STORAGE_DIR")]
    pub storage_dir: Option<PathBuf>,

    /// Key prefix for application records in the local store
    #[arg(long, default_value = "app_", env = "JOURNAL_NAMESPACE")]
    pub namespace: String,

    /// Use the remote store only
    #[arg(long, env = "JOURNAL_USE_REMOTE")]
    pub use_remote: bool,

    /// Keep data locally and sync it to the remote store
    #[arg(long, env = "JOURNAL_ENABLE_SYNC")]
    pub enable_sync: bool,

    /// Cloudflare account ID (for D1 API access)
    #[arg(long, env = "CLOUDFLARE_ACCOUNT_ID")]
    pub cloudflare_account_id: Option<String>,

    /// Cloudflare API token (for D1 API access)
    #[arg(long, env = "CLOUDFLARE_API_TOKEN", hide_env_values = true)]
    pub cloudflare_api_token: Option<String>,

    /// D1 database ID (stores the kv_records table)
    #[arg(long, env = "D1_DATABASE_ID")]
    pub d1_database_id: Option<String>,

    /// Authenticated principal that remote records are scoped to
    #[arg(long, env = "JOURNAL_PRINCIPAL_ID")]
    pub principal_id: Option<String>,

    /// Timeout for any remote request (milliseconds)
    #[arg(long, default_value = "10000", env = "JOURNAL_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: u64,

    /// Timeout for remote health probes (milliseconds)
    #[arg(long, default_value = "2000", env = "JOURNAL_HEALTH_TIMEOUT_MS")]
    pub health_timeout_ms: u64,
}

impl Config {
    /// Remote settings, if all D1 credentials are present.
    pub fn remote_config(&self) -> Option<RemoteConfig> {
        let (Some(account_id), Some(api_token), Some(database_id)) = (
            self.cloudflare_account_id.clone(),
            self.cloudflare_api_token.clone(),
            self.d1_database_id.clone(),
        ) else {
            return None;
        };

        Some(
            RemoteConfig::new(account_id, api_token, database_id).with_timeouts(
                Duration::from_millis(self.request_timeout_ms),
                Duration::from_millis(self.health_timeout_ms),
            ),
        )
    }

    pub fn principal(&self) -> Option<Principal> {
        self.principal_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(Principal::new)
    }

    pub fn storage_dir(&self) -> PathBuf {
        self.storage_dir.clone().unwrap_or_else(FileStore::default_dir)
    }

    pub fn storage_config(&self) -> StorageConfig {
        StorageConfig {
            use_remote: self.use_remote,
            enable_sync: self.enable_sync,
            namespace: self.namespace.clone(),
            local: LocalStoreConfig::Directory(self.storage_dir()),
            remote: self.remote_config(),
        }
    }
}
