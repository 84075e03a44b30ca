//! HTTP transport for the gateway
//!
//! Bodies are taken as raw bytes and parsed by the dispatcher, so malformed JSON
//! surfaces as the gateway's own `BadRequest` error body instead of an extractor
//! rejection.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use super::dispatcher::{Gateway, GatewayResponse, Rejection};
use crate::compare::{BackendId, Comparator};
use crate::envelope::{elapsed_ms, timed};
use crate::error::{GatewayError, Result};
use crate::id::now_secs_f64;
use crate::observability::Event;

const SERVICE_NAME: &str = "mcp-gateway";

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    /// Absent when no backend URLs are configured
    pub comparator: Option<Arc<Comparator>>,
}

impl AppState {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
            comparator: None,
        }
    }

    pub fn with_comparator(mut self, comparator: Comparator) -> Self {
        self.comparator = Some(Arc::new(comparator));
        self
    }

    fn comparator(&self) -> Result<&Comparator> {
        self.comparator
            .as_deref()
            .ok_or_else(|| GatewayError::Config("No backends configured".to_string()))
    }
}

/// Error body returned for transport-level rejections
#[derive(Debug)]
pub struct ApiError {
    pub error: GatewayError,
    /// Time spent before the request was refused
    pub latency_ms: f64,
}

impl ApiError {
    pub fn new(error: GatewayError, latency_ms: f64) -> Self {
        Self { error, latency_ms }
    }

    pub fn status(&self) -> StatusCode {
        status_for(&self.error)
    }
}

impl From<Rejection> for ApiError {
    fn from(rejection: Rejection) -> Self {
        Self::new(rejection.error, rejection.latency_ms)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.error.detail();
        let body = json!({
            "detail": message,
            "error": {
                "code": self.error.code(),
                "message": message
            },
            "latency_ms": self.latency_ms
        });
        (status, Json(body)).into_response()
    }
}

/// HTTP status for an error that escaped the dispatcher or comparator
pub fn status_for(err: &GatewayError) -> StatusCode {
    match err {
        GatewayError::BadRequest(_) | GatewayError::Json(_) | GatewayError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
        GatewayError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        GatewayError::Transport(_) => StatusCode::BAD_GATEWAY,
        GatewayError::Execution(_) | GatewayError::Internal(_) | GatewayError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Build the gateway router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/mcp", post(handle_mcp))
        .route("/compare", post(handle_compare))
        .route("/route/{backend}", post(handle_route))
        .with_state(state)
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        log::info!("Gateway listening on http://{}", addr);
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    log::info!("Gateway stopped");
    Ok(())
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "tools_available": state.gateway.registry().len()
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "tools_available": state.gateway.registry().len(),
        "timestamp": now_secs_f64()
    }))
}

async fn handle_mcp(State(state): State<AppState>, body: Bytes) -> std::result::Result<Json<GatewayResponse>, ApiError> {
    let response = state.gateway.dispatch_bytes(&body).await?;
    Ok(Json(response))
}

async fn handle_compare(State(state): State<AppState>, body: Bytes) -> std::result::Result<Json<GatewayResponse>, ApiError> {
    let start = Instant::now();
    let outcome = async {
        let comparator = state.comparator()?;
        let payload = parse_payload(&body)?;
        let (outcome, latency_ms) = timed(comparator.compare(&payload)).await;
        let response = match outcome.faster_backend {
            Some(_) => GatewayResponse::ok(serde_json::to_value(&outcome)?, latency_ms),
            None => GatewayResponse {
                success: false,
                data: Some(serde_json::to_value(&outcome)?),
                error: Some("All backends failed".to_string()),
                latency_ms,
            },
        };
        Ok::<_, GatewayError>(response)
    }
    .await;

    outcome.map(Json).map_err(|err| reject(&state, "compare", start, err))
}

async fn handle_route(
    State(state): State<AppState>,
    Path(backend): Path<String>,
    body: Bytes,
) -> std::result::Result<Json<GatewayResponse>, ApiError> {
    let start = Instant::now();
    let outcome = async {
        let comparator = state.comparator()?;
        let backend_id: BackendId = backend.parse()?;
        let payload = parse_payload(&body)?;
        comparator.route(&payload, backend_id).await
    }
    .await;

    outcome.map(Json).map_err(|err| reject(&state, "route", start, err))
}

fn parse_payload(body: &[u8]) -> Result<Value> {
    serde_json::from_slice(body).map_err(|e| GatewayError::BadRequest(format!("Malformed request body: {}", e)))
}

fn reject(state: &AppState, action: &str, start: Instant, err: GatewayError) -> ApiError {
    let status = status_for(&err);
    let latency_ms = elapsed_ms(start);
    log::warn!("{} rejected with {}: {}", action, status.as_u16(), err);
    state.gateway.sink().record(
        Event::request("http_error", latency_ms)
            .with_data(json!({"action": action, "status_code": status.as_u16()}))
            .with_error(err.detail()),
    );
    ApiError::new(err, latency_ms)
}
