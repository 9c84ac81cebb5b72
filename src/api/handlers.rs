//! HTTP API handlers.

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;

use super::response::{data, no_content, ApiError, HealthStatus};
use crate::lifecycle::InFlight;
use crate::store::SharedStore;
use crate::utils::parse_positive_id;

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Record store.
    pub store: SharedStore,
    /// Requests currently being served.
    pub in_flight: InFlight,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state around a store.
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            in_flight: InFlight::new(),
            metrics: None,
        }
    }

    /// Expose `/metrics` through the given handle.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Body of `POST /hello`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateHelloRequest {
    /// Message text; missing or null counts as empty.
    #[serde(default)]
    pub message: Option<String>,
}

fn path_id(path: Result<Path<String>, PathRejection>) -> Result<i64, ApiError> {
    let raw = match path {
        Ok(Path(raw)) => raw,
        Err(rejection) => return Err(ApiError::InvalidId(rejection.body_text())),
    };
    parse_positive_id(&raw).ok_or(ApiError::InvalidId(raw))
}

/// `GET /hello` - every message.
pub async fn list_hellos(State(state): State<AppState>) -> Result<Response, ApiError> {
    let records = state
        .store
        .list()
        .await
        .map_err(|e| ApiError::from_store("list", e))?;
    Ok(data(StatusCode::OK, records))
}

/// `GET /hello/{id}` - one message.
pub async fn get_hello(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    let id = path_id(path)?;
    let record = state
        .store
        .get(id)
        .await
        .map_err(|e| ApiError::from_store("get", e))?;
    Ok(data(StatusCode::OK, record))
}

/// `POST /hello` - create a message.
pub async fn create_hello(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let body = body.map_err(|e| ApiError::InvalidJson(e.body_text()))?;
    let value: serde_json::Value =
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidJson(e.to_string()))?;
    // Derived struct impls also accept arrays; only objects are valid here.
    if !value.is_object() {
        return Err(ApiError::InvalidJson("expected a JSON object".to_string()));
    }
    let request: CreateHelloRequest =
        serde_json::from_value(value).map_err(|e| ApiError::InvalidJson(e.to_string()))?;

    let text = request.message.unwrap_or_default();
    let record = state
        .store
        .create(&text)
        .await
        .map_err(|e| ApiError::from_store("create", e))?;
    Ok(data(StatusCode::CREATED, record))
}

/// `DELETE /hello/{id}` - remove a message.
pub async fn delete_hello(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    let id = path_id(path)?;
    state
        .store
        .delete(id)
        .await
        .map_err(|e| ApiError::from_store("delete", e))?;
    Ok(no_content())
}

/// `GET /health` - 200 when the store answers a ping, 503 otherwise.
pub async fn health(State(state): State<AppState>) -> Result<Response, ApiError> {
    state.store.ping().await.map_err(ApiError::Unavailable)?;
    Ok(data(StatusCode::OK, HealthStatus { status: "ok" }))
}

/// `GET /metrics` - Prometheus exposition, 404 without a recorder.
pub async fn metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let handle = state.metrics.as_ref().ok_or(ApiError::NotFound)?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
        .into_response())
}

/// `/hello/` with no id segment.
pub async fn missing_id() -> ApiError {
    ApiError::InvalidId(String::new())
}

/// Fallback for unsupported methods on known paths.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Fallback for unknown routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
