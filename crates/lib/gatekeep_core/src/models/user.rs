//! Principals managed by the identity store.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::role::Role;

/// Domain user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<Role>,
    pub enabled: bool,
    /// SHA-256 hex digest of the live refresh secret, if any.
    pub refresh_digest: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data needed to create a principal.
#[derive(Debug, Clone, Validate)]
pub struct NewUser {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    /// Defaults to `[Role::User]` when empty.
    pub roles: Vec<Role>,
    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "must match password"))]
    pub password_confirm: String,
}

/// Field-level optional changes to a principal.
#[derive(Debug, Clone, Default, Validate)]
pub struct UpdateUser {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: Option<String>,
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
    pub roles: Option<Vec<Role>>,
    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    pub password: Option<String>,
    pub password_confirm: Option<String>,
    /// Plaintext refresh secret; stored as a digest.
    pub refresh_secret: Option<String>,
    pub enabled: Option<bool>,
}
