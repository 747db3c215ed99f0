//! Error types for web handlers.
//!
//! Bridges [`CoreError`] and HTTP: every handler returns
//! `Result<_, AppError>` and the domain error decides the status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rsvp_core::CoreError;
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
///
/// Wraps domain errors and provides HTTP-friendly error responses via
/// Axum's `IntoResponse`.
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code.
    status: StatusCode,
    /// Error message (user-facing).
    message: String,
    /// Error code (for client error handling).
    code: &'static str,
    /// Internal error (for logging, not exposed to the client).
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: &'static str) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Attach a source error for logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message.into(), "BAD_REQUEST")
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message.into(), "UNAUTHORIZED")
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR",
        )
    }

    /// The HTTP status this error maps to.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::NotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, message, "NOT_FOUND")
            }
            CoreError::InvalidState { .. } | CoreError::DeadlinePassed => {
                Self::new(StatusCode::BAD_REQUEST, message, "BAD_REQUEST")
            }
            CoreError::InvalidSignature => {
                Self::new(StatusCode::BAD_REQUEST, message, "INVALID_SIGNATURE")
            }
            CoreError::Conflict { .. } => Self::new(StatusCode::CONFLICT, message, "CONFLICT"),
            CoreError::CapacityExhausted => {
                Self::new(StatusCode::CONFLICT, message, "CAPACITY_EXHAUSTED")
            }
            CoreError::Forbidden { .. } => Self::new(StatusCode::FORBIDDEN, message, "FORBIDDEN"),
            CoreError::Gateway { .. } => Self::new(StatusCode::BAD_GATEWAY, message, "GATEWAY"),
            // Storage details stay server-side.
            CoreError::Storage { .. } => {
                Self::internal("an internal error occurred").with_source(anyhow::anyhow!(message))
            }
        }
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: &'static str,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                code = self.code,
                message = %self.message,
                source = ?self.source,
                "internal server error"
            );
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: CoreError) -> StatusCode {
        AppError::from(err).status()
    }

    #[test]
    fn not_found_maps_to_404() {
        assert_eq!(
            status_of(CoreError::not_found("event", "e1")),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn invalid_state_family_maps_to_400() {
        assert_eq!(
            status_of(CoreError::invalid_state("closed")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(CoreError::DeadlinePassed), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(CoreError::InvalidSignature),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn conflict_family_maps_to_409() {
        assert_eq!(
            status_of(CoreError::conflict("duplicate")),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(CoreError::CapacityExhausted),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn forbidden_maps_to_403() {
        assert_eq!(
            status_of(CoreError::Forbidden {
                required: "manage_events"
            }),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn gateway_maps_to_502() {
        assert_eq!(
            status_of(CoreError::gateway("timeout")),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn storage_maps_to_500_without_leaking() {
        let err = AppError::from(CoreError::storage("connection refused to db-host:5432"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.to_string().contains("db-host"));
    }

    #[test]
    fn error_display_carries_code() {
        let err = AppError::bad_request("invalid input");
        assert_eq!(err.to_string(), "[BAD_REQUEST] invalid input");
    }
}
