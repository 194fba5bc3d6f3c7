//! Signing key set.
//!
//! Keys are an explicit configuration value: a map from key id to key
//! material plus the id preferred for new tokens. Rotation builds a new
//! `KeySet`; tokens signed with a retired-but-retained key keep verifying.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::info;

use crate::error::AuthError;

/// Key id used when a single unnamed secret is configured.
pub const DEFAULT_KID: &str = "default";

/// Key material for one key id.
#[derive(Clone)]
pub struct SigningKey {
    pub(crate) algorithm: Algorithm,
    pub(crate) encoding: EncodingKey,
    pub(crate) decoding: DecodingKey,
}

impl SigningKey {
    /// HS256 key from a shared secret.
    pub fn hmac(secret: &[u8]) -> Self {
        Self {
            algorithm: Algorithm::HS256,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Named signing keys plus the active key id.
#[derive(Clone, Default)]
pub struct KeySet {
    keys: BTreeMap<String, SigningKey>,
    active: Option<String>,
}

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a key. The first key added becomes active.
    pub fn with_key(mut self, kid: impl Into<String>, key: SigningKey) -> Self {
        let kid = kid.into();
        if self.active.is_none() {
            self.active = Some(kid.clone());
        }
        self.keys.insert(kid, key);
        self
    }

    /// Add an HS256 key from a shared secret.
    pub fn with_hmac(self, kid: impl Into<String>, secret: &[u8]) -> Self {
        self.with_key(kid, SigningKey::hmac(secret))
    }

    /// Point new issuance at `kid`, which must already be present.
    pub fn with_active(mut self, kid: &str) -> Result<Self, AuthError> {
        if !self.keys.contains_key(kid) {
            return Err(AuthError::KeyNotFound(kid.to_string()));
        }
        self.active = Some(kid.to_string());
        Ok(self)
    }

    /// Drop a key. Tokens signed with it stop verifying.
    pub fn without(mut self, kid: &str) -> Self {
        self.keys.remove(kid);
        if self.active.as_deref() == Some(kid) {
            self.active = None;
        }
        self
    }

    pub fn active_kid(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn kids(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, kid: &str) -> Option<&SigningKey> {
        self.keys.get(kid)
    }

    /// Parse `kid:secret[,kid:secret…]`. The first entry becomes active.
    pub fn parse_list(spec: &str) -> Result<Self, AuthError> {
        let mut set = KeySet::new();
        let entries = spec.split(',').map(str::trim).filter(|e| !e.is_empty());
        for (i, entry) in entries.enumerate() {
            let (kid, secret) = entry.split_once(':').ok_or_else(|| {
                AuthError::InvalidArgument(format!("key entry #{} is not kid:secret", i + 1))
            })?;
            let (kid, secret) = (kid.trim(), secret.trim());
            if kid.is_empty() || secret.is_empty() {
                return Err(AuthError::InvalidArgument(
                    "key entries need a non-empty kid and secret".into(),
                ));
            }
            set = set.with_hmac(kid, secret.as_bytes());
        }
        if set.is_empty() {
            return Err(AuthError::NoActiveKey);
        }
        Ok(set)
    }
}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySet")
            .field("kids", &self.keys.keys().collect::<Vec<_>>())
            .field("active", &self.active)
            .finish()
    }
}

/// Resolve the signing secret: env var `JWT_SECRET` → `AUTH_SECRET` → persisted file.
pub fn resolve_jwt_secret() -> String {
    if let Ok(secret) = std::env::var("JWT_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    if let Ok(secret) = std::env::var("AUTH_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    let secret_path = jwt_secret_path();
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret = generate_signing_secret();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&secret_path, &secret);
    info!(path = %secret_path.display(), "generated new signing secret");
    secret
}

/// A fresh 64-character alphanumeric signing secret.
pub fn generate_signing_secret() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

/// Path to the persisted signing secret file.
fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gatekeep")
        .join("jwt-secret")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_key_becomes_active() {
        let set = KeySet::new().with_hmac("a", b"one").with_hmac("b", b"two");
        assert_eq!(set.active_kid(), Some("a"));
        assert_eq!(set.kids().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn activating_unknown_kid_fails() {
        let err = KeySet::new().with_hmac("a", b"one").with_active("zz").unwrap_err();
        assert!(matches!(err, AuthError::KeyNotFound(kid) if kid == "zz"));
    }

    #[test]
    fn removing_active_key_clears_active() {
        let set = KeySet::new().with_hmac("a", b"one").without("a");
        assert!(set.active_kid().is_none());
        assert!(set.is_empty());
    }

    #[test]
    fn parse_list_reads_pairs() {
        let set = KeySet::parse_list("k1:alpha, k2:beta").unwrap();
        assert_eq!(set.active_kid(), Some("k1"));
        assert!(set.get("k2").is_some());
    }

    #[test]
    fn parse_list_rejects_malformed_entries() {
        assert!(KeySet::parse_list("k1").is_err());
        assert!(KeySet::parse_list("k1:").is_err());
        assert!(matches!(KeySet::parse_list(" , "), Err(AuthError::NoActiveKey)));
    }

    #[test]
    fn debug_hides_material() {
        let set = KeySet::new().with_hmac("a", b"super-secret");
        let dbg = format!("{set:?}");
        assert!(dbg.contains("\"a\""));
        assert!(!dbg.contains("super-secret"));
    }

    #[test]
    fn generated_secret_is_64_chars() {
        assert_eq!(generate_signing_secret().len(), 64);
    }
}
