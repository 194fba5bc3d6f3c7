//! Postgres-backed identity store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::UserStore;
use crate::error::AuthError;
use crate::models::User;
use crate::role;

type UserRow = (
    Uuid,
    String,
    String,
    String,
    Vec<String>,
    bool,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);

const SELECT_USER: &str = "SELECT id, name, email, password_hash, roles, enabled, refresh_digest, \
     created_at, updated_at FROM users";

fn to_user(row: UserRow) -> Result<User, AuthError> {
    let (id, name, email, password_hash, roles, enabled, refresh_digest, created_at, updated_at) =
        row;
    let roles = role::parse_many(&roles)
        .map_err(|e| AuthError::Internal(format!("stored roles for {id}: {e}")))?;
    Ok(User {
        id,
        name,
        email,
        password_hash,
        roles,
        enabled,
        refresh_digest,
        created_at,
        updated_at,
    })
}

/// [`UserStore`] over the `users` table.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one(&self, clause: &str, bind: &str, what: &str) -> Result<User, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE {clause}"))
            .bind(bind)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => to_user(row),
            None => Err(AuthError::NotFound(what.to_string())),
        }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: &User) -> Result<(), AuthError> {
        sqlx::query(
            "INSERT INTO users \
             (id, name, email, password_hash, roles, enabled, refresh_digest, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(role::to_strings(&user.roles))
        .bind(user.enabled)
        .bind(&user.refresh_digest)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::from_user_write(e, &user.email))?;
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<(), AuthError> {
        let result = sqlx::query(
            "UPDATE users SET name = $2, email = $3, password_hash = $4, roles = $5, \
             enabled = $6, refresh_digest = $7, updated_at = $8 \
             WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(role::to_strings(&user.roles))
        .bind(user.enabled)
        .bind(&user.refresh_digest)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::from_user_write(e, &user.email))?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound(format!("user {}", user.id)));
        }
        Ok(())
    }

    async fn replace_refresh(&self, user: &User, expected: &str) -> Result<bool, AuthError> {
        let result = sqlx::query(
            "UPDATE users SET refresh_digest = $2, updated_at = $3 \
             WHERE id = $1 AND refresh_digest = $4",
        )
        .bind(user.id)
        .bind(&user.refresh_digest)
        .bind(user.updated_at)
        .bind(expected)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, user: &User) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn query_by_id(&self, id: Uuid) -> Result<User, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => to_user(row),
            None => Err(AuthError::NotFound(format!("user {id}"))),
        }
    }

    async fn query_by_email(&self, email: &str) -> Result<User, AuthError> {
        self.fetch_one("email = $1", email, "user by email").await
    }

    async fn query_by_refresh_digest(&self, digest: &str) -> Result<User, AuthError> {
        self.fetch_one("refresh_digest = $1", digest, "user by refresh secret")
            .await
    }
}
