//! Refresh-secret exchange.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::Validate;

use super::{AuthRequest, AuthStrategy, IdentityContext, credential, decode_body};
use crate::auth::TokenIssuer;
use crate::auth::token::SESSION_TOKEN_HOURS;
use crate::error::AuthError;
use crate::users::UserBus;

/// Refresh body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RefreshRequest {
    #[serde(rename = "refreshToken")]
    #[validate(length(min = 1, message = "is required"))]
    pub refresh_token: String,
}

/// Exchanges a still-valid bearer token plus its live refresh secret for
/// renewed claims.
///
/// Only resolves the owner; the caller rotates the secret, which re-checks
/// that it is still live.
pub struct RefreshStrategy {
    tokens: Arc<TokenIssuer>,
    users: Arc<UserBus>,
}

impl RefreshStrategy {
    pub fn new(tokens: Arc<TokenIssuer>, users: Arc<UserBus>) -> Self {
        Self { tokens, users }
    }
}

#[async_trait]
impl AuthStrategy for RefreshStrategy {
    fn name(&self) -> &'static str {
        "refresh"
    }

    async fn authenticate(&self, req: &AuthRequest<'_>) -> Result<IdentityContext, AuthError> {
        let token = credential(req.authorization, "Bearer")?;
        let claims = self.tokens.verify_at(token, req.now)?;
        let subject = claims.subject_id()?;

        let body: RefreshRequest = decode_body(req.body)?;
        let owner = self
            .users
            .query_by_refresh_secret(&body.refresh_token)
            .await
            .map_err(AuthError::into_unauthenticated)?;

        if owner.id != subject {
            debug!(subject = %subject, "refresh secret belongs to another principal");
            return Err(AuthError::unauthenticated("invalid refresh secret"));
        }
        if !owner.enabled {
            return Err(AuthError::unauthenticated("user disabled"));
        }

        let renewed = claims.renewed(req.now, Duration::hours(SESSION_TOKEN_HOURS));
        Ok(IdentityContext::user(owner.id, Some(renewed), req.now))
    }
}
