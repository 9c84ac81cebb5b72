//! HTTP API: message CRUD, health and metrics endpoints.

pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;

pub use handlers::AppState;
pub use response::ApiError;
pub use routes::create_router;
