//! HTTP client for services that delegate to the identity service.
//!
//! Every call runs under a single deadline covering connect, request and
//! body. There are no retries; any failure is `Unauthenticated`.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;
use uuid::Uuid;
use validator::Validate;

use crate::authz::Rule;
use crate::error::AuthError;
use crate::models::Claims;

/// Default deadline for delegated calls: 5 seconds.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(5);

/// Path of the identity service's authenticate endpoint.
pub const AUTHENTICATE_PATH: &str = "v1/auth/authenticate";

/// Path of the identity service's authorize endpoint.
pub const AUTHORIZE_PATH: &str = "v1/auth/authorize";

/// Body returned by the authenticate endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticateResponse {
    #[serde(rename = "userID")]
    pub user_id: Uuid,
    pub claims: Claims,
}

/// Body accepted by the authorize endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct AuthorizeRequest {
    pub claims: Claims,
    /// Owner of the resource being accessed, when there is one.
    #[serde(rename = "userID", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    pub rule: Rule,
}

/// Client for the identity service's delegation endpoints.
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: Client,
    authenticate_url: Url,
    authorize_url: Url,
    deadline: Duration,
}

impl AuthClient {
    /// Client for the identity service rooted at `base`
    /// (e.g. `http://auth:3000`).
    pub fn new(base: &str) -> Result<Self, AuthError> {
        let mut base = Url::parse(base)
            .map_err(|e| AuthError::InvalidArgument(format!("auth service url: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let join = |path: &str| {
            base.join(path)
                .map_err(|e| AuthError::InvalidArgument(format!("auth service url: {e}")))
        };

        Ok(Self {
            http: Client::new(),
            authenticate_url: join(AUTHENTICATE_PATH)?,
            authorize_url: join(AUTHORIZE_PATH)?,
            deadline: DEFAULT_DEADLINE,
        })
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Forward a raw `Authorization` header value for verification.
    pub async fn authenticate(&self, authorization: &str) -> Result<AuthenticateResponse, AuthError> {
        let call = async {
            let resp = self
                .http
                .get(self.authenticate_url.clone())
                .header(AUTHORIZATION, authorization)
                .send()
                .await
                .map_err(|e| format!("send: {e}"))?;
            if !resp.status().is_success() {
                return Err(format!("status {}", resp.status()));
            }
            resp.json::<AuthenticateResponse>()
                .await
                .map_err(|e| format!("decode: {e}"))
        };
        self.bounded("authenticate", call).await
    }

    /// Ask the identity service to decide `req`. Any outcome but success is
    /// a deny.
    pub async fn authorize(&self, req: &AuthorizeRequest) -> Result<(), AuthError> {
        let call = async {
            let resp = self
                .http
                .post(self.authorize_url.clone())
                .json(req)
                .send()
                .await
                .map_err(|e| format!("send: {e}"))?;
            if !resp.status().is_success() {
                return Err(format!("status {}", resp.status()));
            }
            Ok(())
        };
        self.bounded("authorize", call).await
    }

    async fn bounded<T>(
        &self,
        op: &str,
        call: impl Future<Output = Result<T, String>>,
    ) -> Result<T, AuthError> {
        match tokio::time::timeout(self.deadline, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(cause)) => {
                debug!(op, %cause, "delegated call failed");
                Err(AuthError::unauthenticated(format!("{op}: {cause}")))
            }
            Err(_) => {
                debug!(op, deadline_ms = self.deadline.as_millis() as u64, "delegated call timed out");
                Err(AuthError::unauthenticated(format!("{op}: deadline exceeded")))
            }
        }
    }
}
