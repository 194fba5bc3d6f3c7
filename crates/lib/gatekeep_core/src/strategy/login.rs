//! Email and password login.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{AuthRequest, AuthStrategy, IdentityContext, decode_body};
use crate::auth::TokenIssuer;
use crate::auth::token::SESSION_TOKEN_HOURS;
use crate::error::AuthError;
use crate::users::UserBus;

/// Login body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

/// Authenticates a JSON `{email, password}` body and mints session claims.
///
/// The caller issues the token pair and persists the refresh secret.
pub struct LoginStrategy {
    tokens: Arc<TokenIssuer>,
    users: Arc<UserBus>,
}

impl LoginStrategy {
    pub fn new(tokens: Arc<TokenIssuer>, users: Arc<UserBus>) -> Self {
        Self { tokens, users }
    }
}

#[async_trait]
impl AuthStrategy for LoginStrategy {
    fn name(&self) -> &'static str {
        "login"
    }

    async fn authenticate(&self, req: &AuthRequest<'_>) -> Result<IdentityContext, AuthError> {
        let login: LoginRequest = decode_body(req.body)?;
        let usr = self.users.authenticate(&login.email, &login.password).await?;
        let claims = self
            .tokens
            .mint(&usr, req.now, Duration::hours(SESSION_TOKEN_HOURS));
        Ok(IdentityContext::user(usr.id, Some(claims), req.now))
    }
}
