//! HTTP API route definitions.

use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{
    create_hello, delete_hello, get_hello, health, list_hellos, method_not_allowed, metrics,
    missing_id, not_found, AppState,
};
use super::middleware::log_requests;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Messages
        .route(
            "/hello",
            get(list_hellos)
                .post(create_hello)
                .fallback(method_not_allowed),
        )
        // The wildcard never matches an empty segment
        .route(
            "/hello/",
            get(missing_id)
                .delete(missing_id)
                .fallback(method_not_allowed),
        )
        .route(
            "/hello/*id",
            get(get_hello)
                .delete(delete_hello)
                .fallback(method_not_allowed),
        )
        // Health and metrics
        .route("/health", get(health).fallback(method_not_allowed))
        .route("/metrics", get(metrics).fallback(method_not_allowed))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
