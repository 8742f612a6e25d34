//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chess_trainer_core::{CreateGameError, PortError, ValidationReport};
use serde_json::json;
use tracing::{error, info};

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// A game submission that failed validation.
    #[error("Invalid game submission")]
    Validation(ValidationReport),

    /// A request body that could not be read as a JSON object.
    #[error("Malformed request body: {0}")]
    MalformedBody(#[from] JsonRejection),

    /// The request carried no usable owner identity.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents an error from running the database migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl From<CreateGameError> for ApiError {
    fn from(err: CreateGameError) -> Self {
        match err {
            CreateGameError::Invalid(report) => ApiError::Validation(report),
            CreateGameError::Port(port) => ApiError::Port(port),
        }
    }
}

/// Convenience type alias for handler return values.
pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Validation(report) => {
                info!(?report, "Rejected game submission");
                return (StatusCode::BAD_REQUEST, Json(report)).into_response();
            }
            ApiError::MalformedBody(rejection) => {
                info!(error = %rejection, "Rejected request body");
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", rejection.body_text())
            }
            ApiError::Port(PortError::NotFound(msg)) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::Port(PortError::Conflict(msg)) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            other => {
                error!(error = %other, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_port_errors_to_statuses() {
        let not_found = ApiError::from(PortError::NotFound("game x".into())).into_response();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let conflict = ApiError::from(PortError::Conflict("game x".into())).into_response();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let unexpected = ApiError::from(PortError::Unexpected("boom".into())).into_response();
        assert_eq!(unexpected.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn validation_failures_are_bad_requests() {
        let err = ApiError::from(CreateGameError::Invalid(ValidationReport::default()));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
