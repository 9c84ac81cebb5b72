//! Unified error types for the hello service.

use thiserror::Error;

/// Top-level error type for startup and command execution.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but rejected by validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Record store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// IO error (listener bind, accept loop).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Record store errors.
///
/// Each variant maps onto one class of HTTP outcome: validation failures are
/// client errors, `NotFound` is a 404, `Unavailable` is a failed liveness
/// check, and everything else is a persistence failure.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Input rejected before the store was touched.
    #[error("validation failed: {0}")]
    Validation(&'static str),

    /// No record with the requested id.
    #[error("record {id} not found")]
    NotFound {
        /// The missing id.
        id: i64,
    },

    /// The liveness check failed.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// SQL driver error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Non-SQL backend failure.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether this error is a persistence failure (as opposed to a
    /// validation, not-found or liveness outcome).
    pub fn is_persistence(&self) -> bool {
        matches!(self, StoreError::Database(_) | StoreError::Backend(_))
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
