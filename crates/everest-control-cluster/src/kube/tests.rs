// everest-control-cluster/src/kube/tests.rs
// ============================================================================
// Module: Kube Cluster Client Tests
// Description: Unit tests for URL layout, headers, and status mapping.
// Purpose: Exercise the client against in-process HTTP servers.
// Dependencies: everest-control-cluster, axum
// ============================================================================

//! ## Overview
//! Each test spawns an axum server that records the request it receives and
//! answers with a canned status and body.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::Method;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::http::header::AUTHORIZATION;
use everest_control_core::ClusterClient;
use everest_control_core::ClusterError;
use everest_control_core::ClusterObject;
use everest_control_core::ResourceKind;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::oneshot;

use super::KubeClusterClient;
use super::MAX_ERROR_MESSAGE_LEN;
use super::MAX_RESPONSE_BYTES;
use super::TokenError;
use super::read_ca_file;
use super::read_token_file;
use super::truncate_message;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Self-signed P-256 certificate standing in for a cluster CA.
const CLUSTER_CA_PEM: &str = "-----BEGIN CERTIFICATE-----
MIIBmzCCAUGgAwIBAgIUZ5hJya66Qn1oWO0l1T2BKBhS9LUwCgYIKoZIzj0EAwIw
IjEgMB4GA1UEAwwXZXZlcmVzdC10ZXN0LWNsdXN0ZXItY2EwIBcNMjYxMDE5MDYz
OTEzWhgPMjEyNjA5MjUwNjM5MTNaMCIxIDAeBgNVBAMMF2V2ZXJlc3QtdGVzdC1j
bHVzdGVyLWNhMFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAEFMamLn76WsoeZoEX
76z+L2Hl0NJWB+faLwi92evyBd6BaH/9Em1c4ZgTLmmu1yE6LryazmEyc2VUmdRd
a+iBOKNTMFEwHQYDVR0OBBYEFIQ/pTjpFl65yvsCTw7TGaGYaBcfMB8GA1UdIwQY
MBaAFIQ/pTjpFl65yvsCTw7TGaGYaBcfMA8GA1UdEwEB/wQFMAMBAf8wCgYIKoZI
zj0EAwIDSAAwRQIhALJFl053w01Rp3Y8eezkiuCglYL2+BdmmOaNphofUjDdAiBr
DxPwiKJN3gzA0cAaXFo34iTq8YGwvXGBVhtgX98emQ==
-----END CERTIFICATE-----
";

/// Request as seen by the test server.
#[derive(Default, Clone)]
struct Captured {
    method: String,
    path: String,
    query: Option<String>,
    authorization: Option<String>,
    body: String,
}

struct TestServerState {
    status: StatusCode,
    body: String,
    capture: Mutex<Vec<Captured>>,
}

async fn handler(
    State(state): State<Arc<TestServerState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    state.capture.lock().expect("capture lock").push(Captured {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        body,
    });
    (state.status, state.body.clone())
}

async fn spawn_server(
    status: StatusCode,
    body: Value,
) -> (String, Arc<TestServerState>, oneshot::Sender<()>) {
    let state = Arc::new(TestServerState {
        status,
        body: body.to_string(),
        capture: Mutex::new(Vec::new()),
    });
    let app = Router::new().fallback(handler).with_state(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await;
    });
    (format!("http://{addr}"), state, shutdown_tx)
}

fn client_with_base(base_url: &str, auth_token: Option<String>) -> KubeClusterClient {
    KubeClusterClient::new(
        base_url,
        auth_token,
        Duration::from_millis(500),
        Duration::from_millis(2_000),
    )
    .expect("client")
}

/// Serves one chunked response of `total` bytes without a content length.
async fn spawn_chunked_server(total: usize) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut request = vec![0_u8; 4096];
        let _ = socket.read(&mut request).await;
        let head = "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
                    transfer-encoding: chunked\r\n\r\n";
        if socket.write_all(head.as_bytes()).await.is_err() {
            return;
        }
        let chunk = vec![b' '; 256 * 1024];
        let mut sent = 0;
        while sent < total {
            let frame = format!("{:x}\r\n", chunk.len());
            if socket.write_all(frame.as_bytes()).await.is_err()
                || socket.write_all(&chunk).await.is_err()
                || socket.write_all(b"\r\n").await.is_err()
            {
                return;
            }
            sent += chunk.len();
        }
        let _ = socket.write_all(b"0\r\n\r\n").await;
    });
    format!("http://{addr}")
}

fn last_request(state: &TestServerState) -> Captured {
    state.capture.lock().expect("capture lock").last().cloned().expect("request captured")
}

// ============================================================================
// SECTION: URL Layout
// ============================================================================

#[test]
fn namespace_urls_use_core_api() {
    let client = client_with_base("http://example.local/", None);
    let url = client.object_url(ResourceKind::Namespace, Some("ignored"), "db1").expect("url");
    assert_eq!(url.as_str(), "http://example.local/api/v1/namespaces/db1");
}

#[test]
fn custom_resource_urls_include_group_and_namespace() {
    let client = client_with_base("http://example.local", None);
    let url = client
        .object_url(ResourceKind::DatabaseClusterRestore, Some("prod"), "restore-1")
        .expect("url");
    assert_eq!(
        url.as_str(),
        "http://example.local/apis/everest.percona.com/v1alpha1/namespaces/prod/\
         databaseclusterrestores/restore-1"
    );
}

#[test]
fn all_namespace_list_omits_namespace_segment() {
    let client = client_with_base("http://example.local", None);
    let url = client.collection_url(ResourceKind::DatabaseCluster, None).expect("url");
    assert_eq!(
        url.as_str(),
        "http://example.local/apis/everest.percona.com/v1alpha1/databaseclusters"
    );
}

#[test]
fn base_path_prefix_is_preserved() {
    let client = client_with_base("http://proxy.local/k8s/", None);
    let url = client.collection_url(ResourceKind::Namespace, None).expect("url");
    assert_eq!(url.as_str(), "http://proxy.local/k8s/api/v1/namespaces");
}

#[test]
fn name_segments_are_percent_encoded() {
    let client = client_with_base("http://example.local", None);
    let url = client.object_url(ResourceKind::Namespace, None, "a/b").expect("url");
    assert_eq!(url.as_str(), "http://example.local/api/v1/namespaces/a%2Fb");
}

#[test]
fn invalid_auth_token_rejected() {
    let client = client_with_base("http://example.local", Some("bad\ntoken".to_string()));
    let err = client.build_headers().expect_err("invalid token");
    assert!(matches!(err, ClusterError::Unavailable(_)));
}

#[test]
fn unparseable_base_url_rejected() {
    let result = KubeClusterClient::new(
        "not a url",
        None,
        Duration::from_millis(500),
        Duration::from_millis(500),
    );
    assert!(matches!(result, Err(ClusterError::Unavailable(_))));
}

// ============================================================================
// SECTION: Requests
// ============================================================================

#[tokio::test]
async fn get_sends_bearer_and_decodes_body() {
    let body = json!({"metadata": {"name": "db1", "labels": {"app.kubernetes.io/managed-by": "everest"}}});
    let (base_url, state, shutdown_tx) = spawn_server(StatusCode::OK, body).await;
    let client = client_with_base(&base_url, Some("token-123".to_string()));
    let object = client.get(ResourceKind::Namespace, None, "db1").await.expect("get");
    assert_eq!(object.name(), Some("db1"));
    assert_eq!(object.label("app.kubernetes.io/managed-by"), Some("everest"));
    let request = last_request(&state);
    assert_eq!(request.method, "GET");
    assert_eq!(request.path, "/api/v1/namespaces/db1");
    assert_eq!(request.authorization.as_deref(), Some("Bearer token-123"));
    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn list_passes_label_selector_and_keeps_order() {
    let body = json!({"items": [
        {"metadata": {"name": "r2", "namespace": "prod"}},
        {"metadata": {"name": "r1", "namespace": "prod"}},
    ]});
    let (base_url, state, shutdown_tx) = spawn_server(StatusCode::OK, body).await;
    let client = client_with_base(&base_url, None);
    let items = client
        .list(ResourceKind::DatabaseClusterRestore, Some("prod"), Some("clusterName=db1"))
        .await
        .expect("list");
    let names: Vec<_> = items.iter().filter_map(ClusterObject::name).collect();
    assert_eq!(names, vec!["r2", "r1"]);
    let request = last_request(&state);
    assert_eq!(
        request.path,
        "/apis/everest.percona.com/v1alpha1/namespaces/prod/databaseclusterrestores"
    );
    assert_eq!(request.query.as_deref(), Some("labelSelector=clusterName%3Ddb1"));
    assert_eq!(request.authorization, None);
    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn list_without_items_is_empty() {
    let (base_url, _state, shutdown_tx) = spawn_server(StatusCode::OK, json!({"items": null})).await;
    let client = client_with_base(&base_url, None);
    let items = client.list(ResourceKind::Namespace, None, None).await.expect("list");
    assert!(items.is_empty());
    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn create_fills_type_metadata_and_posts_to_collection() {
    let (base_url, state, shutdown_tx) =
        spawn_server(StatusCode::CREATED, json!({"metadata": {"name": "r1"}})).await;
    let client = client_with_base(&base_url, None);
    let object = ClusterObject::new(json!({"metadata": {"name": "r1", "namespace": "prod"}}));
    client
        .create(ResourceKind::DatabaseClusterRestore, Some("prod"), &object)
        .await
        .expect("create");
    let request = last_request(&state);
    assert_eq!(request.method, "POST");
    assert_eq!(
        request.path,
        "/apis/everest.percona.com/v1alpha1/namespaces/prod/databaseclusterrestores"
    );
    let sent: Value = serde_json::from_str(&request.body).expect("json body");
    assert_eq!(sent["apiVersion"], "everest.percona.com/v1alpha1");
    assert_eq!(sent["kind"], "DatabaseClusterRestore");
    assert_eq!(sent["metadata"]["name"], "r1");
    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn replace_keeps_caller_type_metadata() {
    let (base_url, state, shutdown_tx) = spawn_server(StatusCode::OK, json!({})).await;
    let client = client_with_base(&base_url, None);
    let object = ClusterObject::new(json!({"apiVersion": "custom/v9", "kind": "Other"}));
    client
        .replace(ResourceKind::DatabaseClusterRestore, Some("prod"), "r1", &object)
        .await
        .expect("replace");
    let request = last_request(&state);
    assert_eq!(request.method, "PUT");
    assert!(request.path.ends_with("/databaseclusterrestores/r1"));
    let sent: Value = serde_json::from_str(&request.body).expect("json body");
    assert_eq!(sent["apiVersion"], "custom/v9");
    assert_eq!(sent["kind"], "Other");
    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn non_object_body_is_rejected_before_sending() {
    let (base_url, state, shutdown_tx) = spawn_server(StatusCode::OK, json!({})).await;
    let client = client_with_base(&base_url, None);
    let object = ClusterObject::new(json!(["not", "an", "object"]));
    let err = client
        .create(ResourceKind::DatabaseClusterRestore, Some("prod"), &object)
        .await
        .expect_err("array body");
    assert!(matches!(err, ClusterError::Rejected { status: 400, .. }));
    assert!(state.capture.lock().expect("capture lock").is_empty());
    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn delete_uses_delete_method() {
    let (base_url, state, shutdown_tx) = spawn_server(StatusCode::OK, json!({"status": "Success"})).await;
    let client = client_with_base(&base_url, None);
    client
        .delete(ResourceKind::DatabaseClusterRestore, Some("prod"), "r1")
        .await
        .expect("delete");
    assert_eq!(last_request(&state).method, "DELETE");
    let _ = shutdown_tx.send(());
}

// ============================================================================
// SECTION: Status Mapping
// ============================================================================

#[tokio::test]
async fn status_mappings_are_consistent() {
    for (status, body, expected) in [
        (
            StatusCode::NOT_FOUND,
            json!({"kind": "Status", "message": "namespaces \"db1\" not found"}),
            ClusterError::NotFound {
                kind: "Namespace",
                name: "db1".to_string(),
            },
        ),
        (
            StatusCode::CONFLICT,
            json!({"kind": "Status", "message": "already exists"}),
            ClusterError::Rejected {
                status: 409,
                message: "already exists".to_string(),
            },
        ),
        (
            StatusCode::FORBIDDEN,
            json!("plain"),
            ClusterError::Rejected {
                status: 403,
                message: "403 Forbidden".to_string(),
            },
        ),
    ] {
        let (base_url, _state, shutdown_tx) = spawn_server(status, body).await;
        let client = client_with_base(&base_url, None);
        let err = client.get(ResourceKind::Namespace, None, "db1").await.expect_err("mapped error");
        assert_eq!(err, expected);
        let _ = shutdown_tx.send(());
    }
}

#[tokio::test]
async fn unreachable_server_is_unavailable() {
    let client = client_with_base("http://127.0.0.1:1", None);
    let err = client.get(ResourceKind::Namespace, None, "db1").await.expect_err("unreachable");
    assert!(matches!(err, ClusterError::Unavailable(_)));
}

#[tokio::test]
async fn list_with_non_array_items_is_invalid() {
    let (base_url, _state, shutdown_tx) = spawn_server(StatusCode::OK, json!({"items": 7})).await;
    let client = client_with_base(&base_url, None);
    let err = client.list(ResourceKind::Namespace, None, None).await.expect_err("bad items");
    assert!(matches!(err, ClusterError::InvalidResponse(_)));
    let _ = shutdown_tx.send(());
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

#[test]
fn long_messages_are_truncated_on_char_boundary() {
    let message = "é".repeat(MAX_ERROR_MESSAGE_LEN);
    let truncated = truncate_message(message);
    assert!(truncated.len() <= MAX_ERROR_MESSAGE_LEN);
    assert!(truncated.chars().all(|c| c == 'é'));
}

#[test]
fn token_file_is_trimmed() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("token");
    fs::write(&path, "  secret-token\n").expect("write token");
    assert_eq!(read_token_file(&path).expect("token"), "secret-token");
}

#[test]
fn empty_token_file_is_invalid() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("token");
    fs::write(&path, "\n").expect("write token");
    assert!(matches!(read_token_file(&path), Err(TokenError::Invalid(_))));
}

#[test]
fn ca_file_is_returned_verbatim() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("ca.crt");
    fs::write(&path, CLUSTER_CA_PEM).expect("write ca");
    assert_eq!(read_ca_file(&path).expect("ca"), CLUSTER_CA_PEM.as_bytes());
}

#[test]
fn ca_file_without_certificate_is_invalid() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("ca.crt");
    fs::write(&path, "not a certificate\n").expect("write ca");
    assert!(matches!(read_ca_file(&path), Err(TokenError::Invalid(_))));
}

// ============================================================================
// SECTION: Cluster CA and Body Limits
// ============================================================================

#[tokio::test]
async fn client_trusting_cluster_ca_serves_requests() {
    let (base_url, state, shutdown_tx) =
        spawn_server(StatusCode::OK, json!({ "metadata": { "name": "db1" } })).await;
    let client = KubeClusterClient::with_ca_pem(
        &base_url,
        None,
        CLUSTER_CA_PEM.as_bytes(),
        Duration::from_millis(500),
        Duration::from_millis(2_000),
    )
    .expect("client with cluster ca");
    let object = client.get(ResourceKind::Namespace, None, "db1").await.expect("get");
    assert_eq!(object.name(), Some("db1"));
    assert_eq!(last_request(&state).path, "/api/v1/namespaces/db1");
    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn chunked_body_over_limit_is_rejected() {
    let base_url = spawn_chunked_server(MAX_RESPONSE_BYTES + 512 * 1024).await;
    let client = client_with_base(&base_url, None);
    let err = client.get(ResourceKind::Namespace, None, "db1").await.expect_err("oversized");
    match err {
        ClusterError::InvalidResponse(message) => {
            assert_eq!(message, "response exceeds size limit");
        }
        other => panic!("expected size limit error, got {other}"),
    }
}
