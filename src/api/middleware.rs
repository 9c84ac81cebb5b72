//! Request logging middleware.

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::info;

use super::handlers::AppState;
use crate::metrics;

/// Log one line per request and keep the in-flight counter current.
///
/// The response passes through untouched.
pub async fn log_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let _in_flight = state.in_flight.track();
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let elapsed = start.elapsed();
    info!(
        method = %method,
        path = %path,
        status,
        remote = %remote,
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        "{} {} [{}] from {} in {:?}",
        method,
        path,
        status,
        remote,
        elapsed
    );

    metrics::record_http_latency(start, metrics::endpoint_label(&path));
    metrics::inc_http_requests(method.as_str(), status);

    response
}
