//! Postgres-backed reset-secret store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::ResetStore;
use crate::error::AuthError;
use crate::models::ResetSecret;

#[derive(Debug, Clone)]
pub struct PgResetStore {
    pool: PgPool,
}

impl PgResetStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResetStore for PgResetStore {
    async fn create(&self, secret: &ResetSecret) -> Result<(), AuthError> {
        sqlx::query("INSERT INTO password_reset_tokens (token, email, expiry_at) VALUES ($1, $2, $3)")
            .bind(&secret.token)
            .bind(&secret.email)
            .bind(secret.expiry_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM password_reset_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn query_by_email(&self, email: &str) -> Result<ResetSecret, AuthError> {
        let row: Option<(String, String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT token, email, expiry_at FROM password_reset_tokens \
             WHERE email = $1 ORDER BY expiry_at DESC LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        let (token, email, expiry_at) =
            row.ok_or_else(|| AuthError::NotFound("reset secret by email".into()))?;
        Ok(ResetSecret {
            email,
            token,
            expiry_at,
        })
    }

    async fn query_by_token(&self, token: &str) -> Result<ResetSecret, AuthError> {
        let row: Option<(String, String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT token, email, expiry_at FROM password_reset_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        let (token, email, expiry_at) =
            row.ok_or_else(|| AuthError::NotFound("reset secret".into()))?;
        Ok(ResetSecret {
            email,
            token,
            expiry_at,
        })
    }
}
