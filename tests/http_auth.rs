// ABOUTME: Integration tests for the HTTP surface: bearer-token guard, routes, and error statuses.
// ABOUTME: Requests go straight into the router via tower's oneshot, no socket involved.

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::Router;
use serde_json::{Value, json};
use tower::ServiceExt;

use wabridge::config::{ReconnectConfig, TransportConfig};
use wabridge::credentials::FileCredentialStore;
use wabridge::http::{HttpState, router};
use wabridge::ingest::MessageIngestSink;
use wabridge::qr::TerminalQrRenderer;
use wabridge::session::{Lifecycle, LifecycleParams, SessionRegistry};
use wabridge::transport::{MemoryController, MemoryTransport};

const TOKEN: &str = "s3cret";

fn app(root: &std::path::Path) -> (Router, Arc<SessionRegistry>, MemoryController) {
    let (transport, controller) = MemoryTransport::new();
    let lifecycle = Lifecycle::new(LifecycleParams {
        transport: Arc::new(transport),
        store: Arc::new(FileCredentialStore::new(root)),
        renderer: Arc::new(TerminalQrRenderer),
        sink: MessageIngestSink::new(),
        transport_config: TransportConfig::default(),
        reconnect: ReconnectConfig::default(),
    });
    let registry = Arc::new(SessionRegistry::new(lifecycle));
    let router = router(HttpState::new(Arc::clone(&registry), TOKEN));
    (router, registry, controller)
}

fn request(method: &str, uri: &str, auth: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn bearer() -> Option<&'static str> {
    Some("Bearer s3cret")
}

#[tokio::test]
async fn missing_or_wrong_token_is_forbidden() {
    let dir = tempfile::tempdir().unwrap();
    let (router, registry, controller) = app(dir.path());

    for auth in [
        None,
        Some("Bearer wrong"),
        Some("s3cret"),
        Some("Bearer "),
        Some("Bearer    s3cret"),
        Some("Bearer s3cret  "),
    ] {
        let response = router
            .clone()
            .oneshot(request("POST", "/whatsapp/session/a", auth, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{auth:?}");
    }

    let response = router
        .clone()
        .oneshot(request(
            "POST",
            "/whatsapp/send/a",
            Some("Bearer wrong"),
            Some(json!({"to": "1@s.whatsapp.net", "text": "hi"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    assert!(registry.list_active().await.is_empty());
    assert_eq!(controller.open_count("a"), 0);
}

#[tokio::test]
async fn create_then_send_with_valid_token() {
    let dir = tempfile::tempdir().unwrap();
    let (router, _registry, controller) = app(dir.path());

    let response = router
        .clone()
        .oneshot(request("POST", "/whatsapp/session/a", bearer(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(
        body["message"],
        "Session a created. Scan the QR code in the console."
    );
    assert_eq!(controller.open_count("a"), 1);

    let response = router
        .clone()
        .oneshot(request(
            "POST",
            "/whatsapp/send/a",
            bearer(),
            Some(json!({"to": "1@s.whatsapp.net", "text": "hi"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["to"], "1@s.whatsapp.net");
    assert_eq!(controller.sent("a").len(), 1);
}

#[tokio::test]
async fn send_to_unknown_session_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let (router, _registry, _controller) = app(dir.path());

    let response = router
        .oneshot(request(
            "POST",
            "/whatsapp/send/ghost",
            bearer(),
            Some(json!({"to": "1@s.whatsapp.net", "text": "hi"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("ghost"));
}

#[tokio::test]
async fn invalid_session_id_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let (router, registry, _controller) = app(dir.path());

    let response = router
        .oneshot(request("POST", "/whatsapp/session/a%5Cb", bearer(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(registry.list_active().await.is_empty());
}

#[tokio::test]
async fn sessions_route_lists_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let (router, registry, _controller) = app(dir.path());
    registry.create_session("b").await.unwrap();
    registry.create_session("a").await.unwrap();

    let response = router
        .oneshot(request("GET", "/whatsapp/sessions", bearer(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(body[0]["generation"], 1);
}
