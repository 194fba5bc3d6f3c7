//! Error taxonomy shared by every identity component.
//!
//! Each [`AuthError`] variant maps to exactly one [`ErrorKind`]; transports
//! pick their response from the kind, never from the variant text.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience alias for identity-core results.
pub type AuthResult<T> = Result<T, AuthError>;

/// The fixed vocabulary of failure kinds exposed at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidArgument,
    Unauthenticated,
    NotFound,
    FailedPrecondition,
    Internal,
    DataLoss,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::NotFound => "not_found",
            ErrorKind::FailedPrecondition => "failed_precondition",
            ErrorKind::Internal => "internal",
            ErrorKind::DataLoss => "data_loss",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub error: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            error: error.into(),
        }
    }
}

/// Identity-core errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Validation failed on {} field(s)", .0.len())]
    Fields(Vec<FieldError>),

    #[error("Email already in use: {0}")]
    DuplicateEmail(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Signing key not found: {0}")]
    KeyNotFound(String),

    #[error("No active signing key configured")]
    NoActiveKey,

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Identity context missing: {0}")]
    MissingIdentity(&'static str),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// The boundary kind for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidArgument(_) | AuthError::Fields(_) | AuthError::DuplicateEmail(_) => {
                ErrorKind::InvalidArgument
            }
            AuthError::Unauthenticated(_) => ErrorKind::Unauthenticated,
            AuthError::NotFound(_) | AuthError::Db(sqlx::Error::RowNotFound) => ErrorKind::NotFound,
            AuthError::KeyNotFound(_) | AuthError::NoActiveKey => ErrorKind::FailedPrecondition,
            AuthError::Signing(_) | AuthError::Db(_) | AuthError::Internal(_) => {
                ErrorKind::Internal
            }
            AuthError::MissingIdentity(_) => ErrorKind::DataLoss,
        }
    }

    /// Field-level detail, when the failure carries any.
    pub fn fields(&self) -> Vec<FieldError> {
        match self {
            AuthError::Fields(fields) => fields.clone(),
            AuthError::DuplicateEmail(_) => vec![FieldError::new("email", "already in use")],
            _ => Vec::new(),
        }
    }

    /// Shorthand for a credential failure.
    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        AuthError::Unauthenticated(msg.into())
    }

    /// Collapses a lookup miss into an authentication failure so callers
    /// cannot tell "no such principal" from "bad credential".
    pub fn into_unauthenticated(self) -> Self {
        match self {
            AuthError::NotFound(msg) => AuthError::Unauthenticated(msg),
            other => other,
        }
    }

    /// Wraps unexpected failures with the operation that hit them. Expected
    /// failures pass through untouched.
    pub fn context(self, op: &str) -> Self {
        match self {
            AuthError::Db(sqlx::Error::RowNotFound) => AuthError::NotFound(op.to_string()),
            AuthError::Db(e) => AuthError::Internal(format!("{op}: {e}")),
            AuthError::Internal(msg) => AuthError::Internal(format!("{op}: {msg}")),
            AuthError::Signing(msg) => AuthError::Signing(format!("{op}: {msg}")),
            other => other,
        }
    }

    /// Map a storage error, turning a unique violation on the users table
    /// into a duplicate-entry condition.
    pub fn from_user_write(e: sqlx::Error, email: &str) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AuthError::DuplicateEmail(email.to_string())
            }
            _ => AuthError::Db(e),
        }
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                errs.iter().map(move |e| {
                    let msg = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    FieldError::new(field.clone(), msg)
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        AuthError::Fields(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_maps_to_its_kind() {
        assert_eq!(
            AuthError::InvalidArgument("x".into()).kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            AuthError::DuplicateEmail("a@x.com".into()).kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            AuthError::unauthenticated("x").kind(),
            ErrorKind::Unauthenticated
        );
        assert_eq!(
            AuthError::Db(sqlx::Error::RowNotFound).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(AuthError::NoActiveKey.kind(), ErrorKind::FailedPrecondition);
        assert_eq!(
            AuthError::KeyNotFound("k".into()).kind(),
            ErrorKind::FailedPrecondition
        );
        assert_eq!(AuthError::Signing("x".into()).kind(), ErrorKind::Internal);
        assert_eq!(
            AuthError::MissingIdentity("user id").kind(),
            ErrorKind::DataLoss
        );
    }

    #[test]
    fn not_found_collapses_to_unauthenticated() {
        let err = AuthError::NotFound("user".into()).into_unauthenticated();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);

        let err = AuthError::Internal("boom".into()).into_unauthenticated();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn context_only_wraps_unexpected_failures() {
        let err = AuthError::Internal("pool closed".into()).context("users.update");
        assert_eq!(err.to_string(), "Internal error: users.update: pool closed");

        let err = AuthError::unauthenticated("bad").context("users.update");
        assert_eq!(err.to_string(), "Unauthenticated: bad");
    }

    #[test]
    fn duplicate_email_reports_field() {
        let fields = AuthError::DuplicateEmail("a@x.com".into()).fields();
        assert_eq!(fields, vec![FieldError::new("email", "already in use")]);
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::FailedPrecondition).unwrap();
        assert_eq!(json, "\"failed_precondition\"");
    }
}
