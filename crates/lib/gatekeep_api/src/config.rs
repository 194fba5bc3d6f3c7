//! API server configuration.

use std::fmt;
use std::time::Duration;

use gatekeep_core::AuthError;
use gatekeep_core::auth::KeySet;
use gatekeep_core::auth::keys::{DEFAULT_KID, generate_signing_secret, resolve_jwt_secret};
use gatekeep_core::users::cache::DEFAULT_TTL;
use tracing::warn;

/// Configuration for the identity service.
#[derive(Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3000").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Issuer stamped into and required on every token.
    pub issuer: String,
    /// Signing keys with the active one marked.
    pub keys: KeySet,
    /// Shared secret for service callers.
    pub api_key: String,
    /// Identity cache TTL. Zero disables the cache.
    pub user_cache_ttl: Duration,
}

impl ApiConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable              | Default                                      |
    /// |-----------------------|----------------------------------------------|
    /// | `BIND_ADDR`           | `127.0.0.1:3000`                             |
    /// | `DATABASE_URL`        | `postgres://localhost:5432/gatekeep`         |
    /// | `AUTH_ISSUER`         | `gatekeep`                                   |
    /// | `JWT_KEYS`            | `kid:secret[,kid:secret…]`, unset by default |
    /// | `JWT_ACTIVE_KID`      | first key of `JWT_KEYS`, else `default`      |
    /// | `JWT_SECRET` / `AUTH_SECRET` | generated & persisted to file         |
    /// | `API_KEY`             | generated per process                        |
    /// | `USER_CACHE_TTL_SECS` | `10`                                         |
    pub fn from_env() -> Result<Self, AuthError> {
        let api_key = match std::env::var("API_KEY") {
            Ok(key) if !key.is_empty() => key,
            _ => {
                warn!("API_KEY not set, generated a per-process key");
                generate_signing_secret()
            }
        };

        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into()),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/gatekeep".into()),
            issuer: std::env::var("AUTH_ISSUER").unwrap_or_else(|_| "gatekeep".into()),
            keys: keys_from_env()?,
            api_key,
            user_cache_ttl: cache_ttl_from_env()?,
        })
    }

    /// A configuration for tests and embedding: one HMAC key, no database.
    pub fn with_secret(secret: &str) -> Self {
        Self {
            bind_addr: "127.0.0.1:0".into(),
            database_url: String::new(),
            issuer: "gatekeep".into(),
            keys: KeySet::new().with_hmac(DEFAULT_KID, secret.as_bytes()),
            api_key: generate_signing_secret(),
            user_cache_ttl: DEFAULT_TTL,
        }
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("issuer", &self.issuer)
            .field("keys", &self.keys)
            .field("api_key", &"<redacted>")
            .field("user_cache_ttl", &self.user_cache_ttl)
            .finish_non_exhaustive()
    }
}

fn keys_from_env() -> Result<KeySet, AuthError> {
    let active = std::env::var("JWT_ACTIVE_KID")
        .ok()
        .filter(|kid| !kid.trim().is_empty());

    match std::env::var("JWT_KEYS") {
        Ok(list) if !list.trim().is_empty() => {
            let keys = KeySet::parse_list(&list)?;
            match active {
                Some(kid) => keys.with_active(kid.trim()),
                None => Ok(keys),
            }
        }
        _ => {
            let kid = active.unwrap_or_else(|| DEFAULT_KID.to_string());
            Ok(KeySet::new().with_hmac(kid.trim(), resolve_jwt_secret().as_bytes()))
        }
    }
}

fn cache_ttl_from_env() -> Result<Duration, AuthError> {
    match std::env::var("USER_CACHE_TTL_SECS") {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| AuthError::InvalidArgument(format!("USER_CACHE_TTL_SECS: {e}"))),
        Err(_) => Ok(DEFAULT_TTL),
    }
}
