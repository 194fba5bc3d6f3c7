//! Static shared-secret authentication for service callers.

use async_trait::async_trait;

use super::{AuthRequest, AuthStrategy, IdentityContext, secrets_match};
use crate::error::AuthError;

/// Header carrying the shared secret.
pub const API_KEY_HEADER: &str = "x-api-key";

pub struct ApiKeyStrategy {
    key: String,
}

impl ApiKeyStrategy {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

#[async_trait]
impl AuthStrategy for ApiKeyStrategy {
    fn name(&self) -> &'static str {
        "api_key"
    }

    async fn authenticate(&self, req: &AuthRequest<'_>) -> Result<IdentityContext, AuthError> {
        match req.api_key {
            Some(presented) if !self.key.is_empty() && secrets_match(presented, &self.key) => {
                Ok(IdentityContext::service(req.now))
            }
            _ => Err(AuthError::unauthenticated("invalid API key")),
        }
    }
}
