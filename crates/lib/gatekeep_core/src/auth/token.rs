//! Token issuance and verification.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Header, Validation, decode, decode_header, encode};
use tracing::debug;

use super::keys::KeySet;
use super::secret::generate_secret;
use crate::error::AuthError;
use crate::models::{Claims, TokenPair, User};

/// Lifetime of interactive session tokens (login and refresh): 8 hours.
pub const SESSION_TOKEN_HOURS: i64 = 8;

/// Lifetime of long-lived service tokens minted from basic credentials: 1 year.
pub const SERVICE_TOKEN_HOURS: i64 = 8760;

/// Signs and verifies claims with a [`KeySet`].
pub struct TokenIssuer {
    keys: KeySet,
    issuer: String,
}

impl TokenIssuer {
    pub fn new(keys: KeySet, issuer: impl Into<String>) -> Self {
        Self {
            keys,
            issuer: issuer.into(),
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn keys(&self) -> &KeySet {
        &self.keys
    }

    /// Key id preferred for new issuance.
    pub fn active_kid(&self) -> Result<&str, AuthError> {
        self.keys.active_kid().ok_or(AuthError::NoActiveKey)
    }

    /// Fresh claims for `user`, valid from `now` for `lifetime`.
    pub fn mint(&self, user: &User, now: DateTime<Utc>, lifetime: Duration) -> Claims {
        Claims::new(user.id, &self.issuer, &user.roles, now, lifetime)
    }

    /// Sign `claims` with key `kid` and pair the token with a new refresh
    /// secret.
    pub fn issue(&self, kid: &str, claims: &Claims) -> Result<TokenPair, AuthError> {
        let key = self
            .keys
            .get(kid)
            .ok_or_else(|| AuthError::KeyNotFound(kid.to_string()))?;

        let mut header = Header::new(key.algorithm);
        header.kid = Some(kid.to_string());

        let claims = Claims {
            kid: Some(kid.to_string()),
            ..claims.clone()
        };

        let token = encode(&header, &claims, &key.encoding)
            .map_err(|e| AuthError::Signing(format!("jwt encode: {e}")))?;

        Ok(TokenPair {
            token,
            refresh_token: generate_secret(),
        })
    }

    /// Verify a token against the current time.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify signature, issuer and validity window at `now`.
    ///
    /// Every failure is `Unauthenticated`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let header = decode_header(token)
            .map_err(|e| AuthError::unauthenticated(format!("token header: {e}")))?;

        let kid = header
            .kid
            .ok_or_else(|| AuthError::unauthenticated("token header carries no kid"))?;

        let key = self
            .keys
            .get(&kid)
            .ok_or_else(|| AuthError::unauthenticated(format!("unknown signing key {kid}")))?;

        let mut validation = Validation::new(key.algorithm);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.set_issuer(&[self.issuer.as_str()]);

        let mut claims = decode::<Claims>(token, &key.decoding, &validation)
            .map_err(|e| AuthError::unauthenticated(format!("token signature: {e}")))?
            .claims;

        if !claims.is_valid_at(now) {
            debug!(kid = %kid, exp = claims.exp, "token outside validity window");
            return Err(AuthError::unauthenticated("token outside validity window"));
        }

        claims.kid = Some(kid);
        Ok(claims)
    }
}
