//! Mapping from core errors to HTTP responses.
//!
//! The shell is the single recovery point: everything that unwinds out of
//! the core lands here and becomes a structured `{error, details?}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use migrator_core::{Migration, MigratorError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<Migration>>,
}

/// Newtype so handlers can return core errors with `?`.
#[derive(Debug)]
pub struct ApiError(pub MigratorError);

impl From<MigratorError> for ApiError {
    fn from(err: MigratorError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            MigratorError::ChecksumVerificationFailed { .. } => StatusCode::FAILED_DEPENDENCY,
            MigratorError::NotFound { .. } => StatusCode::NOT_FOUND,
            MigratorError::InvalidTenantName { .. } | MigratorError::Config { .. } => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let details = match self.0 {
            MigratorError::ChecksumVerificationFailed { ref offending } => Some(offending.clone()),
            _ => None,
        };

        let body = ErrorResponse {
            error: self.0.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
