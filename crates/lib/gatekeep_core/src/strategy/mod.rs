//! Authentication strategies.
//!
//! Every entry point authenticates through exactly one [`AuthStrategy`],
//! and every strategy converges on the same [`IdentityContext`]. A strategy
//! either yields a full context or fails with `Unauthenticated` (bad
//! credential) or `InvalidArgument` (malformed body).

pub mod api_key;
pub mod basic;
pub mod bearer;
pub mod login;
pub mod refresh;
pub mod remote;
pub mod reset;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use uuid::Uuid;
use validator::Validate;

use crate::error::AuthError;
use crate::models::Claims;

pub use api_key::ApiKeyStrategy;
pub use basic::BasicStrategy;
pub use bearer::BearerStrategy;
pub use login::{LoginRequest, LoginStrategy};
pub use refresh::{RefreshRequest, RefreshStrategy};
pub use remote::RemoteStrategy;
pub use reset::ResetStrategy;

/// Who is calling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    /// A principal from the identity store.
    User(Uuid),
    /// A trusted service holding the shared API key.
    Service,
}

/// The identity a strategy attaches to a request.
///
/// Passed explicitly from the strategy to handlers and rule checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityContext {
    pub caller: Caller,
    /// Claims minted or verified for this request. The reset strategy
    /// authenticates a principal without any.
    pub claims: Option<Claims>,
    /// Request time every expiry check for this request is made against.
    pub at: DateTime<Utc>,
}

impl IdentityContext {
    pub fn user(id: Uuid, claims: Option<Claims>, at: DateTime<Utc>) -> Self {
        Self {
            caller: Caller::User(id),
            claims,
            at,
        }
    }

    pub fn service(at: DateTime<Utc>) -> Self {
        Self {
            caller: Caller::Service,
            claims: None,
            at,
        }
    }

    /// The principal id. Its absence means a route was wired to the wrong
    /// strategy.
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        match self.caller {
            Caller::User(id) => Ok(id),
            Caller::Service => Err(AuthError::MissingIdentity("user id")),
        }
    }

    pub fn claims(&self) -> Result<&Claims, AuthError> {
        self.claims
            .as_ref()
            .ok_or(AuthError::MissingIdentity("claims"))
    }
}

/// The parts of an inbound request strategies may look at.
#[derive(Debug, Clone, Copy)]
pub struct AuthRequest<'a> {
    /// Raw `Authorization` header value.
    pub authorization: Option<&'a str>,
    /// Raw API-key header value.
    pub api_key: Option<&'a str>,
    /// One-time secret embedded in the request path.
    pub path_token: Option<&'a str>,
    pub body: &'a [u8],
    pub now: DateTime<Utc>,
}

impl<'a> AuthRequest<'a> {
    /// A request carrying nothing but its arrival time.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            authorization: None,
            api_key: None,
            path_token: None,
            body: &[],
            now,
        }
    }

    pub fn with_authorization(mut self, value: &'a str) -> Self {
        self.authorization = Some(value);
        self
    }

    pub fn with_api_key(mut self, value: &'a str) -> Self {
        self.api_key = Some(value);
        self
    }

    pub fn with_path_token(mut self, value: &'a str) -> Self {
        self.path_token = Some(value);
        self
    }

    pub fn with_body(mut self, body: &'a [u8]) -> Self {
        self.body = body;
        self
    }
}

/// One authentication entry point.
#[async_trait]
pub trait AuthStrategy: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    async fn authenticate(&self, req: &AuthRequest<'_>) -> Result<IdentityContext, AuthError>;
}

/// Split `Authorization: <scheme> <credential>`, matching the scheme
/// case-insensitively.
pub(crate) fn credential<'a>(authorization: Option<&'a str>, scheme: &str) -> Result<&'a str, AuthError> {
    let header = authorization
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| AuthError::unauthenticated("missing authorization header"))?;

    match header.split_once(' ') {
        Some((s, value)) if s.eq_ignore_ascii_case(scheme) && !value.trim().is_empty() => {
            Ok(value.trim())
        }
        _ => Err(AuthError::unauthenticated(format!(
            "expected authorization header format: {scheme} <credential>"
        ))),
    }
}

/// Decode and validate a JSON body.
pub(crate) fn decode_body<T: DeserializeOwned + Validate>(body: &[u8]) -> Result<T, AuthError> {
    let value: T = serde_json::from_slice(body)
        .map_err(|e| AuthError::InvalidArgument(format!("request body: {e}")))?;
    value.validate()?;
    Ok(value)
}

/// Compare two secrets without stopping at the first differing byte.
pub(crate) fn secrets_match(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::Arc;

    use super::*;
    use crate::auth::{KeySet, TokenIssuer};
    use crate::models::User;
    use crate::role::Role;
    use crate::users::UserBus;
    use crate::users::testutil::{bus, new_user};

    pub const EMAIL: &str = "a@x.com";
    pub const PASSWORD: &str = "secret";

    pub struct Fixture {
        pub tokens: Arc<TokenIssuer>,
        pub users: Arc<UserBus>,
        pub user: User,
    }

    pub async fn fixture() -> Fixture {
        let users = Arc::new(bus());
        let user = users
            .create(new_user(EMAIL, PASSWORD, &[Role::User]), Utc::now())
            .await
            .unwrap();
        Fixture {
            tokens: Arc::new(TokenIssuer::new(
                KeySet::new().with_hmac("k1", b"strategy-secret"),
                "gatekeep",
            )),
            users,
            user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn credential_requires_the_scheme() {
        assert_eq!(credential(Some("Bearer abc"), "Bearer").unwrap(), "abc");
        assert_eq!(credential(Some("bearer  abc "), "Bearer").unwrap(), "abc");
        assert!(credential(Some("Basic abc"), "Bearer").is_err());
        assert!(credential(Some("Bearer"), "Bearer").is_err());
        assert!(credential(Some("Bearer "), "Bearer").is_err());
        assert!(credential(None, "Bearer").is_err());
    }

    #[test]
    fn secrets_match_is_exact() {
        assert!(secrets_match("key", "key"));
        assert!(!secrets_match("key", "kez"));
        assert!(!secrets_match("key", "key2"));
        assert!(!secrets_match("", "key"));
    }

    #[test]
    fn service_context_has_no_user() {
        let ctx = IdentityContext::service(Utc::now());
        assert_eq!(ctx.user_id().unwrap_err().kind(), ErrorKind::DataLoss);
        assert_eq!(ctx.claims().unwrap_err().kind(), ErrorKind::DataLoss);
    }
}
