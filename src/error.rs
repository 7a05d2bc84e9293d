use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

pub type AppResult<T> = Result<T, AppError>;

/// Everything a request can fail with. All variants are recoverable at the
/// caller; only `Database` can hide a transient infrastructure fault, which
/// is surfaced as 503 so the client knows a retry is worthwhile.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// The return already reached approved/rejected; terminal states never
    /// transition again.
    #[error("return has already been finalized")]
    AlreadyFinalized,

    #[error("no confirmation code has been issued for this return")]
    CodeNotIssued,

    #[error("confirmation code has expired")]
    CodeExpired,

    #[error("confirmation code does not match")]
    CodeMismatch,

    /// Lost a concurrent compare-and-set race, or a precondition held by
    /// another in-flight request (e.g. a live code already issued).
    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::CodeNotIssued | AppError::CodeMismatch => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyFinalized | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::CodeExpired => StatusCode::GONE,
            AppError::Database(e) if is_transient(e) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Connection-class failures the caller should retry.
fn is_transient(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Don't leak database details to clients
        let message = match &self {
            AppError::Database(e) => {
                error!(error = %e, "Database error");
                if status == StatusCode::SERVICE_UNAVAILABLE {
                    "database temporarily unavailable, retry later".to_string()
                } else {
                    "internal server error".to_string()
                }
            }
            AppError::Internal(e) => {
                error!(error = %e, "Internal error");
                "internal server error".to_string()
            }
            other => {
                warn!(status = %status, "Request failed: {}", other);
                other.to_string()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_transition_maps_to_conflict() {
        assert_eq!(AppError::AlreadyFinalized.status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::Conflict("lost the race".into()).status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn code_errors_map_to_client_errors() {
        assert_eq!(AppError::CodeNotIssued.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::CodeMismatch.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::CodeExpired.status(), StatusCode::GONE);
    }

    #[test]
    fn transient_database_errors_are_retryable() {
        let err = AppError::Database(sqlx::Error::PoolTimedOut);
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
