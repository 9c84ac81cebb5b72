//! JSON envelopes and the HTTP error type.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::error::StoreError;
use crate::metrics;

/// Success envelope: `{"data": ...}`.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    /// Payload.
    pub data: T,
}

/// Error envelope: `{"error": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// User-facing message.
    pub error: &'static str,
}

/// Health payload.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// Always "ok" when served.
    pub status: &'static str,
}

/// Wrap `payload` in the data envelope with the given status.
pub fn data<T: Serialize>(status: StatusCode, payload: T) -> Response {
    (status, Json(DataResponse { data: payload })).into_response()
}

/// Empty 204 response.
pub fn no_content() -> Response {
    (
        StatusCode::NO_CONTENT,
        [(header::CONTENT_TYPE, "application/json")],
    )
        .into_response()
}

/// Errors returned by request handlers.
///
/// The `Display` text carries internal detail for the log; clients only ever
/// see [`ApiError::user_message`].
#[derive(Error, Debug)]
pub enum ApiError {
    /// Body is not a valid `{"message": ...}` object.
    #[error("invalid JSON payload: {0}")]
    InvalidJson(String),

    /// Path id is not a positive integer.
    #[error("invalid id {0:?}")]
    InvalidId(String),

    /// Message text rejected.
    #[error("validation failed: {0}")]
    Validation(&'static str),

    /// No such record or route.
    #[error("not found")]
    NotFound,

    /// Known path, unsupported method.
    #[error("method not allowed")]
    MethodNotAllowed,

    /// A store operation failed.
    #[error("{operation} failed: {source}")]
    Persistence {
        /// Store operation name.
        operation: &'static str,
        /// Underlying failure.
        source: StoreError,
    },

    /// The liveness check failed.
    #[error("database unavailable: {0}")]
    Unavailable(StoreError),
}

impl ApiError {
    /// Translate a store error raised by `operation`.
    pub fn from_store(operation: &'static str, err: StoreError) -> Self {
        match err {
            StoreError::Validation(msg) => ApiError::Validation(msg),
            StoreError::NotFound { .. } => ApiError::NotFound,
            StoreError::Unavailable(_) => ApiError::Unavailable(err),
            StoreError::Database(_) | StoreError::Backend(_) => {
                metrics::inc_store_errors(operation);
                ApiError::Persistence {
                    operation,
                    source: err,
                }
            }
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidJson(_) | ApiError::InvalidId(_) | ApiError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Persistence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message placed in the error envelope.
    pub fn user_message(&self) -> &'static str {
        match self {
            ApiError::InvalidJson(_) => "Invalid JSON payload",
            ApiError::InvalidId(_) => "ID must be a positive integer",
            ApiError::Validation(msg) => *msg,
            ApiError::NotFound => "Not found",
            ApiError::MethodNotAllowed => "Method not allowed",
            ApiError::Persistence { .. } => "DB error",
            ApiError::Unavailable(_) => "DB not available",
        }
    }

    /// Log this error with the level matching its status.
    pub fn log(&self) {
        let status = self.status_code().as_u16();
        let user_message = self.user_message();
        match self {
            ApiError::Persistence { .. } => {
                tracing::error!(status, user_message, error = %self, "Request failed")
            }
            ApiError::Unavailable(_) => {
                tracing::warn!(status, user_message, error = %self, "Request failed")
            }
            _ => tracing::debug!(status, user_message, error = %self, "Request rejected"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.user_message(),
        };
        (status, Json(body)).into_response()
    }
}
