//! Authentication delegated to the identity service.

use std::sync::Arc;

use async_trait::async_trait;

use super::{AuthRequest, AuthStrategy, IdentityContext};
use crate::client::AuthClient;
use crate::error::AuthError;

/// Forwards the raw `Authorization` header to the identity service under
/// the client's deadline. Used by services that hold no signing keys.
pub struct RemoteStrategy {
    client: Arc<AuthClient>,
}

impl RemoteStrategy {
    pub fn new(client: Arc<AuthClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AuthStrategy for RemoteStrategy {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn authenticate(&self, req: &AuthRequest<'_>) -> Result<IdentityContext, AuthError> {
        let header = req
            .authorization
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| AuthError::unauthenticated("missing authorization header"))?;

        let resp = self.client.authenticate(header).await?;
        Ok(IdentityContext::user(resp.user_id, Some(resp.claims), req.now))
    }
}
