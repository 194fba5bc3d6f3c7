//! Identity store.
//!
//! [`UserStore`] is the persistence contract; [`UserBus`] layers credential
//! checks, validation and password hashing on top. The store contract holds
//! with or without [`cache::CachedUserStore`] in front of it.

pub mod cache;
pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;
use validator::{Validate, ValidateEmail};

use crate::auth::password::{BCRYPT_COST, hash_password_with_cost, verify_password};
use crate::auth::secret::digest;
use crate::error::{AuthError, FieldError};
use crate::models::{NewUser, UpdateUser, User};
use crate::role::Role;

/// Persistence contract for principals.
///
/// Lookups that miss return [`AuthError::NotFound`]. Writes that would
/// duplicate an email return [`AuthError::DuplicateEmail`].
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: &User) -> Result<(), AuthError>;

    /// Replace the stored record for `user.id`.
    async fn update(&self, user: &User) -> Result<(), AuthError>;

    /// Store `user.refresh_digest` (and `updated_at`) only if the stored
    /// digest still equals `expected`. Returns whether the write happened.
    async fn replace_refresh(&self, user: &User, expected: &str) -> Result<bool, AuthError>;

    async fn delete(&self, user: &User) -> Result<(), AuthError>;

    async fn query_by_id(&self, id: Uuid) -> Result<User, AuthError>;

    async fn query_by_email(&self, email: &str) -> Result<User, AuthError>;

    async fn query_by_refresh_digest(&self, digest: &str) -> Result<User, AuthError>;
}

/// Business API over a [`UserStore`].
pub struct UserBus {
    store: Arc<dyn UserStore>,
    bcrypt_cost: u32,
}

impl UserBus {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self {
            store,
            bcrypt_cost: BCRYPT_COST,
        }
    }

    /// Override the bcrypt cost (tests use the minimum).
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    /// Add a new principal.
    pub async fn create(&self, nu: NewUser, now: DateTime<Utc>) -> Result<User, AuthError> {
        nu.validate()?;

        let roles = if nu.roles.is_empty() {
            vec![Role::User]
        } else {
            nu.roles
        };

        let usr = User {
            id: Uuid::now_v7(),
            name: nu.name.trim().to_string(),
            email: normalize_email(&nu.email),
            password_hash: hash_password_with_cost(&nu.password, self.bcrypt_cost)?,
            roles,
            enabled: true,
            refresh_digest: None,
            created_at: now,
            updated_at: now,
        };

        self.store
            .create(&usr)
            .await
            .map_err(|e| e.context("users.create"))?;

        info!(user_id = %usr.id, "user created");
        Ok(usr)
    }

    /// Apply field-level changes to `usr` and persist them.
    pub async fn update(
        &self,
        usr: User,
        uu: UpdateUser,
        now: DateTime<Utc>,
    ) -> Result<User, AuthError> {
        uu.validate()?;
        let updated = self.apply(usr, uu, now)?;

        self.store
            .update(&updated)
            .await
            .map_err(|e| e.context("users.update"))?;

        Ok(updated)
    }

    /// Rotate the refresh secret of `usr` from `current` to `next`.
    ///
    /// Fails with `Unauthenticated` if `current` is no longer the live
    /// secret, so concurrent rotations from the same secret cannot both win.
    pub async fn rotate_refresh(
        &self,
        usr: User,
        current: &str,
        next: &str,
        now: DateTime<Utc>,
    ) -> Result<User, AuthError> {
        let updated = User {
            refresh_digest: Some(digest(next)),
            updated_at: now,
            ..usr
        };

        let swapped = self
            .store
            .replace_refresh(&updated, &digest(current))
            .await
            .map_err(|e| e.context("users.rotate_refresh"))?;

        if !swapped {
            debug!(user_id = %updated.id, "refresh secret already rotated");
            return Err(AuthError::unauthenticated("refresh secret is no longer live"));
        }
        Ok(updated)
    }

    pub async fn delete(&self, usr: &User) -> Result<(), AuthError> {
        self.store
            .delete(usr)
            .await
            .map_err(|e| e.context("users.delete"))?;
        info!(user_id = %usr.id, "user deleted");
        Ok(())
    }

    pub async fn query_by_id(&self, id: Uuid) -> Result<User, AuthError> {
        self.store
            .query_by_id(id)
            .await
            .map_err(|e| e.context("users.query_by_id"))
    }

    pub async fn query_by_email(&self, email: &str) -> Result<User, AuthError> {
        self.store
            .query_by_email(&normalize_email(email))
            .await
            .map_err(|e| e.context("users.query_by_email"))
    }

    /// Resolve the principal holding the live refresh secret `secret`.
    pub async fn query_by_refresh_secret(&self, secret: &str) -> Result<User, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::NotFound("empty refresh secret".into()));
        }
        self.store
            .query_by_refresh_digest(&digest(secret))
            .await
            .map_err(|e| e.context("users.query_by_refresh_secret"))
    }

    /// Check an email/password pair.
    ///
    /// A missing principal, a wrong password and a disabled principal all
    /// surface as the same `Unauthenticated` failure.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let usr = self
            .query_by_email(email)
            .await
            .map_err(AuthError::into_unauthenticated)?;

        if !verify_password(password, &usr.password_hash)? {
            return Err(AuthError::unauthenticated("password mismatch"));
        }

        if !usr.enabled {
            return Err(AuthError::unauthenticated("user disabled"));
        }

        Ok(usr)
    }

    fn apply(&self, mut usr: User, uu: UpdateUser, now: DateTime<Utc>) -> Result<User, AuthError> {
        if let Some(name) = uu.name {
            usr.name = name.trim().to_string();
        }
        if let Some(email) = uu.email {
            usr.email = normalize_email(&email);
        }
        if let Some(roles) = uu.roles {
            if roles.is_empty() {
                return Err(AuthError::Fields(vec![FieldError::new(
                    "roles",
                    "at least one role is required",
                )]));
            }
            usr.roles = roles;
        }
        if let Some(password) = uu.password {
            if let Some(confirm) = uu.password_confirm
                && confirm != password
            {
                return Err(AuthError::Fields(vec![FieldError::new(
                    "password_confirm",
                    "must match password",
                )]));
            }
            usr.password_hash = hash_password_with_cost(&password, self.bcrypt_cost)?;
        }
        if let Some(secret) = uu.refresh_secret {
            usr.refresh_digest = Some(digest(&secret));
        }
        if let Some(enabled) = uu.enabled {
            usr.enabled = enabled;
        }
        usr.updated_at = now;
        Ok(usr)
    }
}

/// Emails are compared trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Syntax check used by strategies before touching the store.
pub fn is_valid_email(email: &str) -> bool {
    email.validate_email()
}


#[cfg(test)]
mod tests {
    use super::testutil::{bus, new_user};
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn create_defaults_roles_and_normalizes_email() {
        let users = bus();
        let usr = users
            .create(new_user(" A@X.com ", "secret", &[]), Utc::now())
            .await
            .unwrap();
        assert_eq!(usr.email, "a@x.com");
        assert_eq!(usr.roles, vec![Role::User]);
        assert!(usr.enabled);
        assert_ne!(usr.password_hash, "secret");
    }

    #[tokio::test]
    async fn create_validates_fields() {
        let users = bus();
        let mut nu = new_user("not-an-email", "abc", &[]);
        nu.password_confirm = "xyz".into();
        let err = users.create(nu, Utc::now()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let fields: Vec<String> = err.fields().into_iter().map(|f| f.field).collect();
        assert!(fields.contains(&"email".to_string()));
        assert!(fields.contains(&"password".to_string()));
        assert!(fields.contains(&"password_confirm".to_string()));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let users = bus();
        users
            .create(new_user("a@x.com", "secret", &[]), Utc::now())
            .await
            .unwrap();
        let err = users
            .create(new_user("A@x.com", "secret", &[]), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail(_)));
    }

    #[tokio::test]
    async fn authenticate_does_not_distinguish_failures() {
        let users = bus();
        let usr = users
            .create(new_user("a@x.com", "secret", &[]), Utc::now())
            .await
            .unwrap();

        assert_eq!(users.authenticate("a@x.com", "secret").await.unwrap().id, usr.id);

        let missing = users.authenticate("b@x.com", "secret").await.unwrap_err();
        let wrong = users.authenticate("a@x.com", "nope").await.unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::Unauthenticated);
        assert_eq!(wrong.kind(), ErrorKind::Unauthenticated);
    }

    #[tokio::test]
    async fn disabled_user_cannot_authenticate() {
        let users = bus();
        let usr = users
            .create(new_user("a@x.com", "secret", &[]), Utc::now())
            .await
            .unwrap();
        let change = UpdateUser {
            enabled: Some(false),
            ..Default::default()
        };
        users.update(usr, change, Utc::now()).await.unwrap();

        let err = users.authenticate("a@x.com", "secret").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    }

    #[tokio::test]
    async fn update_password_requires_matching_confirmation() {
        let users = bus();
        let usr = users
            .create(new_user("a@x.com", "secret", &[]), Utc::now())
            .await
            .unwrap();
        let change = UpdateUser {
            password: Some("another".into()),
            password_confirm: Some("different".into()),
            ..Default::default()
        };
        let err = users.update(usr.clone(), change, Utc::now()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let change = UpdateUser {
            password: Some("another".into()),
            password_confirm: Some("another".into()),
            ..Default::default()
        };
        users.update(usr, change, Utc::now()).await.unwrap();
        assert!(users.authenticate("a@x.com", "another").await.is_ok());
    }

    #[tokio::test]
    async fn refresh_secret_resolves_until_rotated() {
        let users = bus();
        let usr = users
            .create(new_user("a@x.com", "secret", &[]), Utc::now())
            .await
            .unwrap();
        let change = UpdateUser {
            refresh_secret: Some("first".into()),
            ..Default::default()
        };
        let usr = users.update(usr, change, Utc::now()).await.unwrap();
        assert_eq!(users.query_by_refresh_secret("first").await.unwrap().id, usr.id);

        let usr = users
            .rotate_refresh(usr, "first", "second", Utc::now())
            .await
            .unwrap();
        assert!(users.query_by_refresh_secret("first").await.is_err());
        assert_eq!(users.query_by_refresh_secret("second").await.unwrap().id, usr.id);

        let err = users
            .rotate_refresh(usr, "first", "third", Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    }

    #[tokio::test]
    async fn empty_refresh_secret_never_matches() {
        let users = bus();
        assert!(users.query_by_refresh_secret("").await.is_err());
    }
}
