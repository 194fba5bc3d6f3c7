//! Claims and token pairs.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;
use crate::role::Role;

/// Signed identity assertion embedded in access tokens.
///
/// Claims are never persisted; they are rebuilt on every authentication
/// event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject, the principal id.
    pub sub: String,
    /// Issuer identifier.
    pub iss: String,
    /// Signing key identifier. Filled from the token header on verification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Roles as assigned to the principal.
    #[serde(default)]
    pub roles: Vec<Role>,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

impl Claims {
    /// Claims for `subject` valid from `now` for `lifetime`.
    pub fn new(
        subject: Uuid,
        issuer: &str,
        roles: &[Role],
        now: DateTime<Utc>,
        lifetime: Duration,
    ) -> Self {
        Self {
            sub: subject.to_string(),
            iss: issuer.to_string(),
            kid: None,
            roles: roles.to_vec(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        }
    }

    /// The same identity with a fresh validity window.
    pub fn renewed(&self, now: DateTime<Utc>, lifetime: Duration) -> Self {
        Self {
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
            ..self.clone()
        }
    }

    /// `iat <= now <= exp`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        let now = now.timestamp();
        self.iat <= now && now <= self.exp
    }

    /// Subject parsed as a principal id. An empty or malformed subject is an
    /// authentication failure.
    pub fn subject_id(&self) -> Result<Uuid, AuthError> {
        if self.sub.is_empty() {
            return Err(AuthError::unauthenticated("claims carry no subject"));
        }
        Uuid::parse_str(&self.sub)
            .map_err(|e| AuthError::unauthenticated(format!("parsing subject: {e}")))
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}

/// Access token plus the opaque refresh secret issued with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub token: String,
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validity_window_is_inclusive() {
        let now = Utc::now();
        let claims = Claims::new(Uuid::now_v7(), "gatekeep", &[Role::User], now, Duration::hours(1));
        assert!(claims.is_valid_at(now));
        assert!(claims.is_valid_at(now + Duration::hours(1)));
        assert!(!claims.is_valid_at(now + Duration::hours(1) + Duration::seconds(1)));
        assert!(!claims.is_valid_at(now - Duration::seconds(1)));
    }

    #[test]
    fn renewed_keeps_identity() {
        let now = Utc::now();
        let id = Uuid::now_v7();
        let claims = Claims::new(id, "gatekeep", &[Role::Admin], now, Duration::minutes(5));
        let later = now + Duration::hours(2);
        let renewed = claims.renewed(later, Duration::hours(8));
        assert_eq!(renewed.sub, claims.sub);
        assert_eq!(renewed.roles, claims.roles);
        assert_eq!(renewed.iat, later.timestamp());
        assert_eq!(renewed.exp, (later + Duration::hours(8)).timestamp());
    }

    #[test]
    fn empty_subject_is_rejected() {
        let mut claims = Claims::new(Uuid::now_v7(), "i", &[], Utc::now(), Duration::hours(1));
        claims.sub.clear();
        assert!(claims.subject_id().is_err());
        claims.sub = "not-a-uuid".into();
        assert!(claims.subject_id().is_err());
    }
}
