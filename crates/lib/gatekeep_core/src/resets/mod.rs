//! Password-reset one-time secrets.
//!
//! Secrets are issued for known emails only, live for [`RESET_TTL_HOURS`],
//! and are dead from their expiry onward even while still stored.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::auth::secret::generate_secret;
use crate::error::AuthError;
use crate::models::ResetSecret;
use crate::users::{UserBus, normalize_email};

/// Lifetime of a reset secret: 1 hour.
pub const RESET_TTL_HOURS: i64 = 1;

/// Persistence contract for reset secrets.
#[async_trait]
pub trait ResetStore: Send + Sync {
    async fn create(&self, secret: &ResetSecret) -> Result<(), AuthError>;

    async fn delete(&self, token: &str) -> Result<(), AuthError>;

    /// Most recently issued secret for `email`.
    async fn query_by_email(&self, email: &str) -> Result<ResetSecret, AuthError>;

    async fn query_by_token(&self, token: &str) -> Result<ResetSecret, AuthError>;
}

/// Issues, resolves and invalidates reset secrets.
pub struct ResetBus {
    store: Arc<dyn ResetStore>,
    users: Arc<UserBus>,
    ttl: Duration,
}

impl ResetBus {
    pub fn new(store: Arc<dyn ResetStore>, users: Arc<UserBus>) -> Self {
        Self {
            store,
            users,
            ttl: Duration::hours(RESET_TTL_HOURS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Issue a secret for `email`. Unknown emails yield `None` and leave no
    /// trace.
    pub async fn create(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ResetSecret>, AuthError> {
        let usr = match self.users.query_by_email(email).await {
            Ok(usr) => usr,
            Err(AuthError::NotFound(_)) => {
                debug!("reset requested for unknown email");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let secret = ResetSecret {
            email: usr.email,
            token: generate_secret(),
            expiry_at: now + self.ttl,
        };

        self.store
            .create(&secret)
            .await
            .map_err(|e| e.context("resets.create"))?;

        info!(user_id = %usr.id, expiry_at = %secret.expiry_at, "reset secret issued");
        Ok(Some(secret))
    }

    /// Resolve a live secret by its value.
    pub async fn lookup_by_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<ResetSecret, AuthError> {
        if token.is_empty() {
            return Err(AuthError::NotFound("empty reset secret".into()));
        }
        let secret = self
            .store
            .query_by_token(token)
            .await
            .map_err(|e| e.context("resets.query_by_token"))?;
        live(secret, now)
    }

    /// Resolve the latest live secret issued for `email`.
    pub async fn lookup_by_email(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<ResetSecret, AuthError> {
        let secret = self
            .store
            .query_by_email(&normalize_email(email))
            .await
            .map_err(|e| e.context("resets.query_by_email"))?;
        live(secret, now)
    }

    /// Delete a secret so it cannot be used again.
    pub async fn invalidate(&self, secret: &ResetSecret) -> Result<(), AuthError> {
        self.store
            .delete(&secret.token)
            .await
            .map_err(|e| e.context("resets.delete"))
    }
}

fn live(secret: ResetSecret, now: DateTime<Utc>) -> Result<ResetSecret, AuthError> {
    if secret.is_expired_at(now) {
        return Err(AuthError::NotFound("reset secret expired".into()));
    }
    Ok(secret)
}


#[cfg(test)]
mod tests {
    use super::testutil::bus;
    use super::*;
    use crate::error::ErrorKind;
    use crate::users::testutil::{bus as user_bus, new_user};

    async fn seeded() -> ResetBus {
        let users = Arc::new(user_bus());
        users
            .create(new_user("a@x.com", "secret", &[]), Utc::now())
            .await
            .unwrap();
        bus(users)
    }

    #[tokio::test]
    async fn known_email_gets_a_secret() {
        let resets = seeded().await;
        let now = Utc::now();
        let secret = resets.create("A@x.com", now).await.unwrap().unwrap();

        assert_eq!(secret.email, "a@x.com");
        assert_eq!(secret.expiry_at, now + Duration::hours(RESET_TTL_HOURS));
        assert!(secret.token.len() >= 43);

        let found = resets.lookup_by_token(&secret.token, now).await.unwrap();
        assert_eq!(found, secret);
        let found = resets.lookup_by_email("a@x.com", now).await.unwrap();
        assert_eq!(found, secret);
    }

    #[tokio::test]
    async fn unknown_email_leaves_no_secret() {
        let resets = seeded().await;
        let now = Utc::now();
        assert!(resets.create("nobody@x.com", now).await.unwrap().is_none());

        let err = resets.lookup_by_email("nobody@x.com", now).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn secret_is_dead_from_its_expiry() {
        let resets = seeded().await;
        let issued = Utc::now();
        let secret = resets.create("a@x.com", issued).await.unwrap().unwrap();

        let just_before = issued + Duration::hours(RESET_TTL_HOURS) - Duration::seconds(1);
        assert!(resets.lookup_by_token(&secret.token, just_before).await.is_ok());

        let at_expiry = issued + Duration::hours(RESET_TTL_HOURS);
        let err = resets
            .lookup_by_token(&secret.token, at_expiry)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = resets
            .lookup_by_email("a@x.com", at_expiry + Duration::days(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn invalidated_secret_is_gone() {
        let resets = seeded().await;
        let now = Utc::now();
        let secret = resets.create("a@x.com", now).await.unwrap().unwrap();
        resets.invalidate(&secret).await.unwrap();
        assert!(resets.lookup_by_token(&secret.token, now).await.is_err());
    }

    #[tokio::test]
    async fn email_lookup_returns_the_latest_secret() {
        let resets = seeded().await;
        let now = Utc::now();
        resets.create("a@x.com", now).await.unwrap().unwrap();
        let later = resets
            .create("a@x.com", now + Duration::minutes(1))
            .await
            .unwrap()
            .unwrap();
        let found = resets
            .lookup_by_email("a@x.com", now + Duration::minutes(2))
            .await
            .unwrap();
        assert_eq!(found.token, later.token);
    }
}
