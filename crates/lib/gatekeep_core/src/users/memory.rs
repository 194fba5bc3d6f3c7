//! In-memory identity store for development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::UserStore;
use crate::error::AuthError;
use crate::models::User;

/// `HashMap`-backed [`UserStore`] enforcing the same uniqueness rules as the
/// Postgres schema.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    fn email_taken(users: &HashMap<Uuid, User>, email: &str, except: Uuid) -> bool {
        users.values().any(|u| u.email == email && u.id != except)
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: &User) -> Result<(), AuthError> {
        let mut users = self.users.write().await;
        if Self::email_taken(&users, &user.email, user.id) {
            return Err(AuthError::DuplicateEmail(user.email.clone()));
        }
        if users.contains_key(&user.id) {
            return Err(AuthError::Internal(format!("user {} already exists", user.id)));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<(), AuthError> {
        let mut users = self.users.write().await;
        if Self::email_taken(&users, &user.email, user.id) {
            return Err(AuthError::DuplicateEmail(user.email.clone()));
        }
        match users.get_mut(&user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(())
            }
            None => Err(AuthError::NotFound(format!("user {}", user.id))),
        }
    }

    async fn replace_refresh(&self, user: &User, expected: &str) -> Result<bool, AuthError> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.id) {
            Some(slot) if slot.refresh_digest.as_deref() == Some(expected) => {
                slot.refresh_digest = user.refresh_digest.clone();
                slot.updated_at = user.updated_at;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(AuthError::NotFound(format!("user {}", user.id))),
        }
    }

    async fn delete(&self, user: &User) -> Result<(), AuthError> {
        self.users.write().await.remove(&user.id);
        Ok(())
    }

    async fn query_by_id(&self, id: Uuid) -> Result<User, AuthError> {
        self.users
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AuthError::NotFound(format!("user {id}")))
    }

    async fn query_by_email(&self, email: &str) -> Result<User, AuthError> {
        self.users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| AuthError::NotFound("user by email".into()))
    }

    async fn query_by_refresh_digest(&self, digest: &str) -> Result<User, AuthError> {
        self.users
            .read()
            .await
            .values()
            .find(|u| u.refresh_digest.as_deref() == Some(digest))
            .cloned()
            .ok_or_else(|| AuthError::NotFound("user by refresh secret".into()))
    }
}
