//! Request and response bodies.

use chrono::{DateTime, Utc};
use gatekeep_core::models::{NewUser, UpdateUser, User};
use gatekeep_core::role::Role;
use gatekeep_core::{ErrorKind, FieldError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub use gatekeep_core::client::{AuthenticateResponse, AuthorizeRequest};
pub use gatekeep_core::strategy::{LoginRequest, RefreshRequest};

/// Error body: `{kind, message, fields?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldError>>,
}

/// Issued credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "must match password"))]
    pub password_confirm: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewUserRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    pub password: String,
    pub password_confirm: String,
}

impl From<NewUserRequest> for NewUser {
    fn from(req: NewUserRequest) -> Self {
        NewUser {
            name: req.name,
            email: req.email,
            roles: req.roles,
            password: req.password,
            password_confirm: req.password_confirm,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub roles: Option<Vec<Role>>,
    pub password: Option<String>,
    pub password_confirm: Option<String>,
    pub enabled: Option<bool>,
}

impl From<UpdateUserRequest> for UpdateUser {
    fn from(req: UpdateUserRequest) -> Self {
        UpdateUser {
            name: req.name,
            email: req.email,
            roles: req.roles,
            password: req.password,
            password_confirm: req.password_confirm,
            refresh_secret: None,
            enabled: req.enabled,
        }
    }
}

/// A principal as exposed over HTTP. Credential material never leaves the
/// service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub roles: Vec<Role>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(usr: User) -> Self {
        Self {
            id: usr.id,
            name: usr.name,
            email: usr.email,
            roles: usr.roles,
            enabled: usr.enabled,
            created_at: usr.created_at,
            updated_at: usr.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
