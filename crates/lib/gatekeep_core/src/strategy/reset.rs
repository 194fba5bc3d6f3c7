//! Password-reset secret in the request path.

use std::sync::Arc;

use async_trait::async_trait;

use super::{AuthRequest, AuthStrategy, IdentityContext};
use crate::error::AuthError;
use crate::resets::ResetBus;
use crate::users::UserBus;

/// Authenticates the owner of a live reset secret. No claims are minted;
/// the context only authorizes the password change itself.
pub struct ResetStrategy {
    resets: Arc<ResetBus>,
    users: Arc<UserBus>,
}

impl ResetStrategy {
    pub fn new(resets: Arc<ResetBus>, users: Arc<UserBus>) -> Self {
        Self { resets, users }
    }
}

#[async_trait]
impl AuthStrategy for ResetStrategy {
    fn name(&self) -> &'static str {
        "reset"
    }

    async fn authenticate(&self, req: &AuthRequest<'_>) -> Result<IdentityContext, AuthError> {
        let token = req
            .path_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::unauthenticated("missing reset secret"))?;

        let secret = self
            .resets
            .lookup_by_token(token, req.now)
            .await
            .map_err(AuthError::into_unauthenticated)?;

        let usr = self
            .users
            .query_by_email(&secret.email)
            .await
            .map_err(AuthError::into_unauthenticated)?;

        Ok(IdentityContext::user(usr.id, None, req.now))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::error::ErrorKind;
    use crate::resets::RESET_TTL_HOURS;
    use crate::resets::testutil::bus;
    use crate::strategy::testutil::{EMAIL, fixture};

    #[tokio::test]
    async fn live_secret_authenticates_its_owner() {
        let fx = fixture().await;
        let resets = Arc::new(bus(fx.users.clone()));
        let now = Utc::now();
        let secret = resets.create(EMAIL, now).await.unwrap().unwrap();

        let ctx = ResetStrategy::new(resets, fx.users)
            .authenticate(&AuthRequest::at(now).with_path_token(&secret.token))
            .await
            .unwrap();
        assert_eq!(ctx.user_id().unwrap(), fx.user.id);
        assert!(ctx.claims.is_none());
    }

    #[tokio::test]
    async fn expired_or_unknown_secret_is_unauthenticated() {
        let fx = fixture().await;
        let resets = Arc::new(bus(fx.users.clone()));
        let now = Utc::now();
        let secret = resets.create(EMAIL, now).await.unwrap().unwrap();
        let strategy = ResetStrategy::new(resets, fx.users);

        let late = now + Duration::hours(RESET_TTL_HOURS);
        let err = strategy
            .authenticate(&AuthRequest::at(late).with_path_token(&secret.token))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);

        let err = strategy
            .authenticate(&AuthRequest::at(now).with_path_token("unknown"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);

        let err = strategy
            .authenticate(&AuthRequest::at(now))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    }
}
