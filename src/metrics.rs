//! Prometheus metrics for request latency and store failures.
//!
//! The recorder is only installed by the binary; without one every macro
//! below is a no-op, which keeps tests free of global state.

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::debug;

// === Metric Name Constants ===

/// HTTP request latency metric name.
pub const METRIC_HTTP_REQUEST_LATENCY: &str = "http_request_latency_ms";
/// HTTP requests counter metric name.
pub const METRIC_HTTP_REQUESTS: &str = "http_requests_total";
/// Store errors counter metric name.
pub const METRIC_STORE_ERRORS: &str = "store_errors_total";

/// Install the Prometheus recorder and register metric descriptions.
/// Call this once at startup.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_histogram!(
        METRIC_HTTP_REQUEST_LATENCY,
        "HTTP request latency in milliseconds"
    );
    describe_counter!(METRIC_HTTP_REQUESTS, "Total number of HTTP requests served");
    describe_counter!(
        METRIC_STORE_ERRORS,
        "Total number of failed record store operations"
    );

    debug!("Metrics initialized");
    Ok(handle)
}

/// Record HTTP request latency.
pub fn record_http_latency(start: Instant, endpoint: &str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_HTTP_REQUEST_LATENCY, "endpoint" => endpoint.to_string()).record(latency_ms);
}

/// Increment the served-requests counter.
pub fn inc_http_requests(method: &str, status: u16) {
    counter!(
        METRIC_HTTP_REQUESTS,
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Increment the store errors counter.
pub fn inc_store_errors(operation: &'static str) {
    counter!(METRIC_STORE_ERRORS, "operation" => operation).increment(1);
}

/// Collapse a request path into a low-cardinality endpoint label.
pub fn endpoint_label(path: &str) -> &'static str {
    match path {
        "/hello" => "/hello",
        "/health" => "/health",
        "/metrics" => "/metrics",
        p if p.starts_with("/hello/") => "/hello/{id}",
        _ => "other",
    }
}
