//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gatekeep_core::{AuthError, ErrorKind, FieldError};
use thiserror::Error;
use tracing::{debug, error};

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Auth(e) => e.kind(),
            AppError::BadRequest(_) => ErrorKind::InvalidArgument,
        }
    }

    fn fields(&self) -> Vec<FieldError> {
        match self {
            AppError::Auth(e) => e.fields(),
            AppError::BadRequest(_) => Vec::new(),
        }
    }
}

/// HTTP status for each boundary kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidArgument | ErrorKind::FailedPrecondition => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Internal | ErrorKind::DataLoss => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let message = match kind {
            ErrorKind::Unauthenticated => {
                debug!(cause = %self, "request unauthenticated");
                "unauthorized".to_string()
            }
            ErrorKind::Internal | ErrorKind::DataLoss => {
                error!(kind = %kind, cause = %self, "request failed");
                "internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let fields = self.fields();
        let body = Json(ErrorResponse {
            kind,
            message,
            fields: (!fields.is_empty()).then_some(fields),
        });
        (status_for(kind), body).into_response()
    }
}
