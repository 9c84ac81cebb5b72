//! HelloWorld message service.
//!
//! A small CRUD HTTP service over a single relational table: list, create,
//! fetch and delete messages, plus a health check that pings the database.
//!
//! ```text
//! GET    /hello        200 {"data":[{"id":1,"message":"hi"}]}
//! GET    /hello/{id}   200 {"data":{...}} | 400 | 404
//! POST   /hello        201 {"data":{...}} | 400
//! DELETE /hello/{id}   204 | 400 | 404
//! GET    /health       200 {"data":{"status":"ok"}} | 503
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`store`]: Record store trait, PostgreSQL and in-memory backends
//! - [`api`]: HTTP handlers, routes and request logging
//! - [`lifecycle`]: Lifecycle states, in-flight tracking and drain
//! - [`server`]: Startup sequence and graceful shutdown
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Signal handling and id parsing

pub mod api;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod server;
pub mod store;
pub mod utils;

pub use config::Config;
pub use error::{Result, ServiceError, StoreError};
