//! Error types for the HTTP API.
//!
//! ## Status Mapping
//! ```text
//! LedgerError::kind()          HTTP
//! ─────────────────────────    ─────────────────────────
//! Validation                   400 Bad Request
//! NotFound                     404 Not Found
//! Conflict                     409 Conflict
//! TransientFailure             500 (retryable message)
//! Db / anything else           500 (generic message, details logged)
//! ```
//!
//! Every error body is `{"error": "..."}`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use garage_core::ErrorKind;
use garage_db::LedgerError;
use serde::Serialize;
use tracing::{error, warn};

/// API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Malformed request body or query string.
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

/// Error envelope.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Status code and client-facing message.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, format!("Invalid request: {}", msg)),
            ApiError::Ledger(err) => match err.kind() {
                Some(ErrorKind::Validation) => (StatusCode::BAD_REQUEST, err.to_string()),
                Some(ErrorKind::NotFound) => (StatusCode::NOT_FOUND, err.to_string()),
                Some(ErrorKind::Conflict) => (StatusCode::CONFLICT, err.to_string()),
                None if err.is_transient() => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "The ledger is busy, please retry".to_string(),
                ),
                None => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string()),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            match &self {
                ApiError::Ledger(err) if err.is_transient() => warn!(error = %err, "Transient ledger failure"),
                other => error!(error = %other, "Request failed"),
            }
        }

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use garage_core::{CoreError, ValidationError};
    use garage_db::DbError;

    fn status_of(err: LedgerError) -> StatusCode {
        ApiError::from(err).status_and_message().0
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_of(CoreError::Validation(ValidationError::Required { field: "description".to_string() }).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CoreError::InvalidAmount { reason: "zero".to_string() }.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(CoreError::JobNotFound("j".to_string()).into()), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(
                CoreError::AlreadyInvoiced {
                    job_id: "j".to_string(),
                    invoice_id: "i".to_string()
                }
                .into()
            ),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(LedgerError::TransientFailure { reason: "locked".to_string() }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_not_leaked() {
        let err = ApiError::from(LedgerError::Db(DbError::Internal("disk I/O error at page 7".to_string())));
        let (status, message) = err.status_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Internal server error");
    }
}
