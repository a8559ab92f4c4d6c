//! Error types for the ingestion jobs and the read-side HTTP surface.
//!
//! [`IngestError`] is what a job invocation fails with; the scheduler logs it
//! and moves on. [`ApiError`] maps each failure of the read surface to an HTTP
//! status code and a structured JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::MachineId;
use crate::persistence::StorageError;
use crate::protocol::ProtocolError;

/// Failure of one job invocation or of one message inside it.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Socket setup or read failure.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Storage gateway failure.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Malformed message.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Leaderboard request failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// A final score arrived for a machine with no ended session.
    #[error("no ended game for machine {0}")]
    NoSession(MachineId),
}

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "machine not found: 10.0.0.5"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

/// Read-side error with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category   | HTTP Status               |
/// |-----------|------------|---------------------------|
/// | 1000–1999 | Validation | 400 Bad Request           |
/// | 2000–2999 | Not Found  | 404 Not Found             |
/// | 3000–3999 | Server     | 500 Internal Server Error |
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request parameters are unusable.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No machine with that address.
    #[error("machine not found: {0}")]
    MachineNotFound(MachineId),

    /// The machine has no running session.
    #[error("no active session on machine {0}")]
    NoActiveSession(MachineId),

    /// Storage gateway failure.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::MachineNotFound(_) => 2001,
            Self::NoActiveSession(_) => 2002,
            Self::Storage(_) => 3001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::MachineNotFound(_) | Self::NoActiveSession(_) => StatusCode::NOT_FOUND,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let Self::Storage(err) = &self {
            tracing::error!(error = %err, "storage failure while serving request");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
            },
        };
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_variants_map_to_404() {
        let err = ApiError::MachineNotFound(MachineId::new("10.0.0.5"));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_code(), 2001);
        assert_eq!(err.to_string(), "machine not found: 10.0.0.5");
    }

    #[test]
    fn storage_errors_are_server_errors() {
        let err = ApiError::from(StorageError::Conflict("x".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn no_session_names_the_machine() {
        let err = IngestError::NoSession(MachineId::new("10.0.0.5"));
        assert_eq!(err.to_string(), "no ended game for machine 10.0.0.5");
    }
}
