// ABOUTME: HTTP surface — session creation, message sending, and session listing behind a bearer token.
// ABOUTME: Handlers are thin; every decision is delegated to the SessionRegistry.

use std::future::Future;
use std::sync::Arc;

use axum::extract::{Path, Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::error::BridgeError;
use crate::session::{SessionRegistry, SessionSummary};
use crate::transport::DeliveryReceipt;

/// Shared state for every route.
#[derive(Clone)]
pub struct HttpState {
    pub registry: Arc<SessionRegistry>,
    pub token: Arc<str>,
}

impl HttpState {
    pub fn new(registry: Arc<SessionRegistry>, token: &str) -> Self {
        Self {
            registry,
            token: Arc::from(token),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub to: String,
    pub text: String,
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status = match &self {
            BridgeError::InvalidSessionId(_) => StatusCode::BAD_REQUEST,
            BridgeError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            BridgeError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Build the router. Every route requires `Authorization: Bearer <token>`.
pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/whatsapp/session/{id}", post(create_session))
        .route("/whatsapp/send/{id}", post(send_message))
        .route("/whatsapp/sessions", get(list_sessions))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token))
        .with_state(state)
}

/// Serve `router` on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "http server listening");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

/// The header must be exactly `Bearer <token>`; no padding, no other scheme.
fn is_authorized(request: &Request, token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == format!("Bearer {token}"))
}

async fn require_token(State(state): State<HttpState>, request: Request, next: Next) -> Response {
    if is_authorized(&request, &state.token) {
        return next.run(request).await;
    }

    warn!(
        path = %request.uri().path(),
        header_present = request.headers().contains_key(header::AUTHORIZATION),
        "rejected unauthorized request"
    );
    (StatusCode::FORBIDDEN, Json(json!({ "error": "forbidden" }))).into_response()
}

async fn create_session(
    State(state): State<HttpState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, BridgeError> {
    state.registry.create_session(&id).await?;
    Ok(Json(json!({
        "message": format!("Session {id} created. Scan the QR code in the console."),
    })))
}

async fn send_message(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    Json(body): Json<SendRequest>,
) -> Result<Json<DeliveryReceipt>, BridgeError> {
    let receipt = state.registry.send(&id, &body.to, &body.text).await?;
    Ok(Json(receipt))
}

async fn list_sessions(State(state): State<HttpState>) -> Json<Vec<SessionSummary>> {
    Json(state.registry.snapshot().await)
}
