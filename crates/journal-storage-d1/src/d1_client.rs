//! D1 client for the `kv_records` table via the Cloudflare REST API.

use std::time::Duration;

use journal_storage_core::StorageError;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::RemoteConfig;

const MAX_RETRIES: u32 = 5;
const BASE_DELAY_MS: u64 = 200;

/// D1 query request body.
#[derive(Serialize)]
struct D1QueryRequest<'a> {
    sql: &'a str,
    params: &'a [String],
}

/// D1 API response structure.
#[derive(Deserialize)]
struct D1Response {
    success: bool,
    result: Option<Vec<D1QueryResult>>,
    errors: Option<Vec<D1Error>>,
}

#[derive(Deserialize)]
struct D1QueryResult {
    results: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct D1Error {
    message: String,
}

/// Client for running SQL against a D1 database.
///
/// Requests are bounded by the configured request timeout; 429 responses are
/// retried with exponential backoff inside that bound.
pub struct D1Client {
    http: Client,
    query_url: String,
    api_token: String,
    request_timeout: Duration,
}

impl D1Client {
    pub fn new(config: &RemoteConfig) -> Result<Self, StorageError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StorageError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            query_url: config.query_url(),
            api_token: config.api_token.clone(),
            request_timeout: config.request_timeout,
        })
    }

    /// POST a query, backing off exponentially while D1 answers 429.
    async fn send_with_retry(&self, body: &D1QueryRequest<'_>) -> Result<Response, StorageError> {
        let mut delay = Duration::from_millis(BASE_DELAY_MS);
        let mut retries = 0;

        loop {
            let response = self
                .http
                .post(&self.query_url)
                .bearer_auth(&self.api_token)
                .json(body)
                .send()
                .await
                .map_err(|e| StorageError::Network(format!("D1 request failed: {}", e)))?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }
            if retries == MAX_RETRIES {
                let text = response.text().await.unwrap_or_default();
                return Err(StorageError::Network(format!(
                    "D1 still rate limited after {} retries: {}",
                    MAX_RETRIES, text
                )));
            }

            retries += 1;
            warn!(
                retry = retries,
                delay_ms = delay.as_millis() as u64,
                "D1 rate limited (429), backing off"
            );
            tokio::time::sleep(delay).await;
            delay *= 2;
        }
    }

    async fn query(&self, sql: &str, params: &[String]) -> Result<Vec<serde_json::Value>, StorageError> {
        let request = D1QueryRequest { sql, params };
        let response = self.send_with_retry(&request).await?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StorageError::Network(format!("Failed to read D1 response: {}", e)))?;

        if !status.is_success() {
            return Err(StorageError::Remote(format!(
                "D1 API returned {}: {}",
                status, body
            )));
        }

        let d1_response: D1Response = serde_json::from_str(&body)
            .map_err(|e| StorageError::Remote(format!("Invalid D1 response: {}", e)))?;

        if !d1_response.success {
            let error_msg = d1_response
                .errors
                .map(|errs| {
                    errs.into_iter()
                        .map(|e| e.message)
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_else(|| "Unknown D1 error".to_string());
            return Err(StorageError::Remote(format!("D1 query failed: {}", error_msg)));
        }

        Ok(d1_response
            .result
            .and_then(|mut r| r.pop())
            .map(|qr| qr.results)
            .unwrap_or_default())
    }

    /// Execute a query and return its result rows.
    ///
    /// Fails with `StorageError::Network` when the whole exchange, retries
    /// included, exceeds the request timeout.
    #[instrument(skip(self, params), level = "debug", fields(params = params.len()))]
    pub async fn execute(
        &self,
        sql: &str,
        params: Vec<String>,
    ) -> Result<Vec<serde_json::Value>, StorageError> {
        let rows = tokio::time::timeout(self.request_timeout, self.query(sql, &params))
            .await
            .map_err(|_| {
                StorageError::Network(format!(
                    "D1 request timed out after {} ms",
                    self.request_timeout.as_millis()
                ))
            })??;

        debug!("D1 query returned {} rows", rows.len());
        Ok(rows)
    }
}
