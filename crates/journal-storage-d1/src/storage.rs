use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use journal_storage_core::{KeyValueBackend, StorageError};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::RemoteConfig;
use crate::d1_client::D1Client;
use crate::principal::{Principal, PrincipalProvider};

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS kv_records (\
     principal_id TEXT NOT NULL, \
     key TEXT NOT NULL, \
     value TEXT NOT NULL, \
     updated_at TEXT NOT NULL, \
     PRIMARY KEY (principal_id, key))";

const SELECT_VALUE_SQL: &str =
    "SELECT value FROM kv_records WHERE principal_id = ?1 AND key = ?2";

const UPSERT_SQL: &str = "INSERT INTO kv_records (principal_id, key, value, updated_at) \
     VALUES (?1, ?2, ?3, ?4) \
     ON CONFLICT (principal_id, key) \
     DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at";

const DELETE_SQL: &str = "DELETE FROM kv_records WHERE principal_id = ?1 AND key = ?2";

// substr instead of LIKE: LIKE is case-insensitive and treats % and _ as wildcards.
const LIST_KEYS_SQL: &str = "SELECT key FROM kv_records \
     WHERE principal_id = ?1 AND substr(key, 1, length(?2)) = ?2";

const CLEAR_SQL: &str = "DELETE FROM kv_records WHERE principal_id = ?1";

const HEALTH_SQL: &str = "SELECT 1 AS ok";

/// Remote backend: records in D1, scoped to the current principal.
///
/// Storage layout:
/// ```text
/// kv_records(principal_id, key, value /* JSON text */, updated_at /* RFC 3339 */)
///   PRIMARY KEY (principal_id, key)
/// ```
/// Without a principal, reads return absent/empty, writes fail with
/// `StorageError::Auth` and the health check reports unhealthy.
pub struct RemoteStorage {
    client: D1Client,
    principal: Arc<dyn PrincipalProvider>,
    health_timeout: Duration,
}

impl RemoteStorage {
    pub fn new(
        config: &RemoteConfig,
        principal: Arc<dyn PrincipalProvider>,
    ) -> Result<Self, StorageError> {
        Ok(Self {
            client: D1Client::new(config)?,
            principal,
            health_timeout: config.health_timeout,
        })
    }

    /// Create the `kv_records` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        self.client.execute(CREATE_TABLE_SQL, vec![]).await?;
        debug!("Ensured kv_records schema");
        Ok(())
    }

    async fn require_principal(&self, operation: &str) -> Result<Principal, StorageError> {
        self.principal.current_principal().await.ok_or_else(|| {
            StorageError::Auth(format!("remote {} requires an authenticated principal", operation))
        })
    }
}

#[async_trait]
impl KeyValueBackend for RemoteStorage {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let Some(principal) = self.principal.current_principal().await else {
            debug!("No principal, remote GET {} is absent", key);
            return Ok(None);
        };

        let rows = self
            .client
            .execute(SELECT_VALUE_SQL, vec![principal.id, key.to_string()])
            .await?;

        let Some(row) = rows.into_iter().next() else {
            debug!("Remote key not found: {}", key);
            return Ok(None);
        };

        let text = row
            .get("value")
            .and_then(Value::as_str)
            .ok_or_else(|| StorageError::Remote(format!("Row for {} has no value column", key)))?;

        let value = serde_json::from_str(text).map_err(|e| {
            StorageError::Serialization(format!("Corrupt remote value for {}: {}", key, e))
        })?;
        Ok(Some(value))
    }

    #[instrument(skip(self, value), level = "debug")]
    async fn set(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let principal = self.require_principal("set").await?;
        let text = serde_json::to_string(value)?;
        let len = text.len();
        let updated_at = chrono::Utc::now().to_rfc3339();

        self.client
            .execute(
                UPSERT_SQL,
                vec![principal.id, key.to_string(), text, updated_at],
            )
            .await?;

        debug!("Remote SET {} ({} bytes)", key, len);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let principal = self.require_principal("remove").await?;
        self.client
            .execute(DELETE_SQL, vec![principal.id, key.to_string()])
            .await?;
        debug!("Remote DELETE {}", key);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let Some(principal) = self.principal.current_principal().await else {
            return Ok(Vec::new());
        };

        let rows = self
            .client
            .execute(LIST_KEYS_SQL, vec![principal.id, prefix.to_string()])
            .await?;

        let mut keys = Vec::with_capacity(rows.len());
        for row in rows {
            match row.get("key").and_then(Value::as_str) {
                Some(key) => keys.push(key.to_string()),
                None => warn!("Skipping remote row without key: {}", row),
            }
        }

        debug!("Listed {} remote keys with prefix {:?}", keys.len(), prefix);
        Ok(keys)
    }

    #[instrument(skip(self), level = "debug")]
    async fn clear(&self) -> Result<(), StorageError> {
        let principal = self.require_principal("clear").await?;
        self.client.execute(CLEAR_SQL, vec![principal.id]).await?;
        debug!("Cleared remote records");
        Ok(())
    }

    /// Reports unhealthy while no principal is signed in.
    async fn health_check(&self) -> bool {
        if self.principal.current_principal().await.is_none() {
            debug!("No principal, remote reported unhealthy");
            return false;
        }

        match tokio::time::timeout(self.health_timeout, self.client.execute(HEALTH_SQL, vec![]))
            .await
        {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                warn!("Remote health check failed: {}", e);
                false
            }
            Err(_) => {
                warn!(
                    "Remote health check timed out after {} ms",
                    self.health_timeout.as_millis()
                );
                false
            }
        }
    }
}
