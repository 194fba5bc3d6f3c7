//! Basic credentials, used to mint long-lived service tokens.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Duration;
use tracing::debug;

use super::{AuthRequest, AuthStrategy, IdentityContext, credential};
use crate::auth::TokenIssuer;
use crate::auth::token::SERVICE_TOKEN_HOURS;
use crate::error::AuthError;
use crate::users::{UserBus, is_valid_email};

/// Authenticates `Authorization: Basic base64(email:password)` and mints
/// claims valid for [`SERVICE_TOKEN_HOURS`]. Refresh secrets are untouched.
pub struct BasicStrategy {
    tokens: Arc<TokenIssuer>,
    users: Arc<UserBus>,
}

impl BasicStrategy {
    pub fn new(tokens: Arc<TokenIssuer>, users: Arc<UserBus>) -> Self {
        Self { tokens, users }
    }
}

fn parse_basic(encoded: &str) -> Option<(String, String)> {
    let decoded = STANDARD.decode(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (email, password) = decoded.split_once(':')?;
    Some((email.to_string(), password.to_string()))
}

#[async_trait]
impl AuthStrategy for BasicStrategy {
    fn name(&self) -> &'static str {
        "basic"
    }

    async fn authenticate(&self, req: &AuthRequest<'_>) -> Result<IdentityContext, AuthError> {
        let encoded = credential(req.authorization, "Basic")?;
        let (email, password) =
            parse_basic(encoded).ok_or_else(|| AuthError::unauthenticated("invalid Basic auth"))?;

        if !is_valid_email(&email) {
            debug!("basic auth with malformed email");
            return Err(AuthError::unauthenticated("invalid Basic auth"));
        }

        let usr = self.users.authenticate(&email, &password).await?;
        let claims = self
            .tokens
            .mint(&usr, req.now, Duration::hours(SERVICE_TOKEN_HOURS));

        Ok(IdentityContext::user(usr.id, Some(claims), req.now))
    }
}
