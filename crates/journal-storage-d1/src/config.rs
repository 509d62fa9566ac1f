use std::time::Duration;

/// Default Cloudflare API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Connection settings for the D1 remote store.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Cloudflare API base URL (overridable for tests and proxies)
    pub api_base_url: String,
    /// Cloudflare account ID
    pub account_id: String,
    /// Cloudflare API token with D1 access
    pub api_token: String,
    /// D1 database ID holding the `kv_records` table
    pub database_id: String,
    /// Upper bound for any single request, retries included
    pub request_timeout: Duration,
    /// Upper bound for the health probe
    pub health_timeout: Duration,
}

impl RemoteConfig {
    pub fn new(account_id: String, api_token: String, database_id: String) -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            account_id,
            api_token,
            database_id,
            request_timeout: Duration::from_secs(10),
            health_timeout: Duration::from_secs(2),
        }
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_timeouts(mut self, request_timeout: Duration, health_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self.health_timeout = health_timeout;
        self
    }

    /// D1 query endpoint.
    pub fn query_url(&self) -> String {
        format!(
            "{}/accounts/{}/d1/database/{}/query",
            self.api_base_url.trim_end_matches('/'),
            self.account_id,
            self.database_id
        )
    }
}
