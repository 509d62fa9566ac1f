use std::sync::Arc;
use std::time::Duration;

use journal_storage::{
    select_backend, Backend, BackendKind, KeyValueBackend, LocalStoreConfig, Principal,
    RemoteConfig, SessionPrincipal, StorageConfig, StorageError,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const QUERY_PATH: &str = "/accounts/acct/d1/database/db/query";

fn rows(results: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "result": [{"results": results}],
        "errors": []
    }))
}

fn storage_config(server: &MockServer, use_remote: bool) -> StorageConfig {
    StorageConfig {
        use_remote,
        enable_sync: true,
        namespace: "app_".into(),
        local: LocalStoreConfig::Memory,
        remote: Some(
            RemoteConfig::new("acct".into(), "token".into(), "db".into())
                .with_api_base_url(server.uri())
                .with_timeouts(Duration::from_secs(5), Duration::from_millis(500)),
        ),
    }
}

async fn backend(server: &MockServer, use_remote: bool, principal: Option<&str>) -> Backend {
    let session = Arc::new(SessionPrincipal::new(principal.map(Principal::new)));
    select_backend(&storage_config(server, use_remote), session)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_offline_write_reaches_d1_after_recovery() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let backend = backend(&server, false, Some("user-1")).await;
    assert_eq!(backend.kind(), BackendKind::Hybrid);

    backend
        .set("mood_2024-01-01", &json!({"mood": 5}))
        .await
        .unwrap();
    assert_eq!(backend.pending_writes().len(), 1);
    assert_eq!(
        backend.get("mood_2024-01-01").await.unwrap(),
        Some(json!({"mood": 5}))
    );
    // Either tier healthy is enough
    assert!(backend.health_check().await);

    server.reset().await;
    Mock::given(method("POST"))
        .and(path(QUERY_PATH))
        .and(body_string_contains("INSERT INTO kv_records"))
        .and(body_string_contains("mood_2024-01-01"))
        .respond_with(rows(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(QUERY_PATH))
        .respond_with(rows(json!([{"ok": 1}])))
        .mount(&server)
        .await;

    let report = backend.process_sync_queue().await;
    assert_eq!(report.synced, 1);
    assert!(report.is_complete());
    assert!(backend.pending_writes().is_empty());
}

#[tokio::test]
async fn test_remote_only_without_principal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(rows(json!([])))
        .mount(&server)
        .await;

    let backend = backend(&server, true, None).await;
    assert_eq!(backend.kind(), BackendKind::Remote);

    assert_eq!(backend.get("mood_1").await.unwrap(), None);
    assert!(backend.list_keys("").await.unwrap().is_empty());
    assert!(matches!(
        backend.set("mood_1", &json!(1)).await,
        Err(StorageError::Auth(_))
    ));
    // Remote-only has no queue
    assert!(backend.pending_writes().is_empty());
}

#[tokio::test]
async fn test_remote_only_health_is_false_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let backend = backend(&server, true, Some("user-1")).await;
    assert!(!backend.health_check().await);
}

#[tokio::test]
async fn test_signed_out_hybrid_routes_to_local() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(QUERY_PATH))
        .respond_with(rows(json!([])))
        .mount(&server)
        .await;

    let session = Arc::new(SessionPrincipal::new(Some(Principal::new("user-1"))));
    let backend = select_backend(&storage_config(&server, false), session.clone())
        .await
        .unwrap();
    backend.set("mood_1", &json!({"mood": 3})).await.unwrap();
    assert!(backend.pending_writes().is_empty());

    session.sign_out().await;

    assert_eq!(
        backend.get("mood_1").await.unwrap(),
        Some(json!({"mood": 3}))
    );
    assert_eq!(backend.list_keys("").await.unwrap(), vec!["mood_1"]);

    // Writes made while signed out wait for the next sign-in
    backend.set("mood_2", &json!({"mood": 4})).await.unwrap();
    assert_eq!(backend.pending_writes().len(), 1);
    assert_eq!(backend.process_sync_queue().await.remaining, 1);

    session.sign_in(Principal::new("user-1")).await;
    let report = backend.process_sync_queue().await;
    assert_eq!(report.synced, 1);
    assert!(report.is_complete());
}
