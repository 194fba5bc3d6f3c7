//! Signed-token authentication.

use std::sync::Arc;

use async_trait::async_trait;

use super::{AuthRequest, AuthStrategy, IdentityContext, credential};
use crate::auth::TokenIssuer;
use crate::error::AuthError;

/// Verifies `Authorization: Bearer <token>` locally.
pub struct BearerStrategy {
    tokens: Arc<TokenIssuer>,
}

impl BearerStrategy {
    pub fn new(tokens: Arc<TokenIssuer>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl AuthStrategy for BearerStrategy {
    fn name(&self) -> &'static str {
        "bearer"
    }

    async fn authenticate(&self, req: &AuthRequest<'_>) -> Result<IdentityContext, AuthError> {
        let token = credential(req.authorization, "Bearer")?;
        let claims = self.tokens.verify_at(token, req.now)?;
        let subject = claims.subject_id()?;
        Ok(IdentityContext::user(subject, Some(claims), req.now))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::error::ErrorKind;
    use crate::strategy::testutil::fixture;

    #[tokio::test]
    async fn valid_token_yields_the_subject() {
        let fx = fixture().await;
        let now = Utc::now();
        let claims = fx.tokens.mint(&fx.user, now, Duration::hours(1));
        let pair = fx.tokens.issue("k1", &claims).unwrap();
        let header = format!("Bearer {}", pair.token);

        let ctx = BearerStrategy::new(fx.tokens)
            .authenticate(&AuthRequest::at(now).with_authorization(&header))
            .await
            .unwrap();
        assert_eq!(ctx.user_id().unwrap(), fx.user.id);
        assert_eq!(ctx.claims().unwrap().roles, fx.user.roles);
    }

    #[tokio::test]
    async fn empty_subject_is_rejected() {
        let fx = fixture().await;
        let now = Utc::now();
        let mut claims = fx.tokens.mint(&fx.user, now, Duration::hours(1));
        claims.sub.clear();
        let pair = fx.tokens.issue("k1", &claims).unwrap();
        let header = format!("Bearer {}", pair.token);

        let err = BearerStrategy::new(fx.tokens)
            .authenticate(&AuthRequest::at(now).with_authorization(&header))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    }

    #[tokio::test]
    async fn expired_token_is_rejected_at_request_time() {
        let fx = fixture().await;
        let issued = Utc::now();
        let claims = fx.tokens.mint(&fx.user, issued, Duration::minutes(1));
        let pair = fx.tokens.issue("k1", &claims).unwrap();
        let header = format!("Bearer {}", pair.token);

        let req = AuthRequest::at(issued + Duration::minutes(2)).with_authorization(&header);
        let err = BearerStrategy::new(fx.tokens)
            .authenticate(&req)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        let fx = fixture().await;
        let err = BearerStrategy::new(fx.tokens)
            .authenticate(&AuthRequest::at(Utc::now()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    }
}
