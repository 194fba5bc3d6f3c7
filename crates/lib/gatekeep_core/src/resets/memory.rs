//! In-memory reset-secret store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::ResetStore;
use crate::error::AuthError;
use crate::models::ResetSecret;

/// `HashMap`-backed [`ResetStore`] keyed by secret value.
#[derive(Debug, Default)]
pub struct MemoryResetStore {
    secrets: RwLock<HashMap<String, ResetSecret>>,
}

impl MemoryResetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResetStore for MemoryResetStore {
    async fn create(&self, secret: &ResetSecret) -> Result<(), AuthError> {
        self.secrets
            .write()
            .await
            .insert(secret.token.clone(), secret.clone());
        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<(), AuthError> {
        self.secrets.write().await.remove(token);
        Ok(())
    }

    async fn query_by_email(&self, email: &str) -> Result<ResetSecret, AuthError> {
        self.secrets
            .read()
            .await
            .values()
            .filter(|s| s.email == email)
            .max_by_key(|s| s.expiry_at)
            .cloned()
            .ok_or_else(|| AuthError::NotFound("reset secret by email".into()))
    }

    async fn query_by_token(&self, token: &str) -> Result<ResetSecret, AuthError> {
        self.secrets
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or_else(|| AuthError::NotFound("reset secret".into()))
    }
}
