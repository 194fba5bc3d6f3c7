//! Authorization evaluator.
//!
//! [`evaluate`] is the pure decision. [`Authorizer`] wraps it for the two
//! execution modes: in-process ([`LocalAuthorizer`]) and delegated to the
//! identity service ([`RemoteAuthorizer`]). Both fail closed.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::client::{AuthClient, AuthorizeRequest};
use crate::error::AuthError;
use crate::models::Claims;
use crate::role::{Role, has_role};
use crate::users::UserBus;

/// Named authorization rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Any authenticated principal.
    Any,
    /// Must hold the base `user` role.
    UserOnly,
    /// Must hold `admin`.
    AdminOnly,
    /// `admin`, or the subject owning the resource.
    AdminOrSubject,
}

impl Rule {
    pub fn as_str(self) -> &'static str {
        match self {
            Rule::Any => "any",
            Rule::UserOnly => "user_only",
            Rule::AdminOnly => "admin_only",
            Rule::AdminOrSubject => "admin_or_subject",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a rule evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// A deny becomes `Unauthenticated` carrying its reason.
    pub fn into_result(self) -> Result<(), AuthError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(AuthError::Unauthenticated(reason)),
        }
    }
}

/// Decide `rule` for `claims` against an optional resource owner.
///
/// Roles are checked by literal membership; the hierarchy does not imply
/// lower roles here.
pub fn evaluate(claims: &Claims, owner: Option<Uuid>, rule: Rule) -> Decision {
    let allowed = match rule {
        Rule::Any => true,
        Rule::UserOnly => has_role(&claims.roles, Role::User),
        Rule::AdminOnly => has_role(&claims.roles, Role::Admin),
        Rule::AdminOrSubject => {
            has_role(&claims.roles, Role::Admin)
                || owner.is_some_and(|id| !claims.sub.is_empty() && claims.sub == id.to_string())
        }
    };

    if allowed {
        Decision::Allow
    } else {
        Decision::Deny(format!("rule {rule} denies subject {:?}", claims.sub))
    }
}

/// Where a decision is made.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(
        &self,
        claims: &Claims,
        owner: Option<Uuid>,
        rule: Rule,
    ) -> Result<(), AuthError>;
}

/// In-process evaluation for the identity service itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalAuthorizer;

#[async_trait]
impl Authorizer for LocalAuthorizer {
    async fn authorize(
        &self,
        claims: &Claims,
        owner: Option<Uuid>,
        rule: Rule,
    ) -> Result<(), AuthError> {
        evaluate(claims, owner, rule).into_result()
    }
}

/// Delegates decisions to the identity service's authorize endpoint.
///
/// Transport failures, timeouts and denies all surface as `Unauthenticated`.
pub struct RemoteAuthorizer {
    client: Arc<AuthClient>,
}

impl RemoteAuthorizer {
    pub fn new(client: Arc<AuthClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Authorizer for RemoteAuthorizer {
    async fn authorize(
        &self,
        claims: &Claims,
        owner: Option<Uuid>,
        rule: Rule,
    ) -> Result<(), AuthError> {
        let req = AuthorizeRequest {
            claims: claims.clone(),
            user_id: owner,
            rule,
        };
        self.client.authorize(&req).await
    }
}

/// Resolves the owner of a resource named by a path segment.
///
/// Supplied by the service owning the resource. A missing resource must
/// surface as `NotFound`; callers fold it into `Unauthenticated`.
#[async_trait]
pub trait OwnerResolver: Send + Sync {
    async fn resolve_owner(&self, resource_id: &str) -> Result<Uuid, AuthError>;
}

/// Owner resolution for principal resources: a user owns itself.
pub struct SubjectOwner {
    users: Arc<UserBus>,
}

impl SubjectOwner {
    pub fn new(users: Arc<UserBus>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl OwnerResolver for SubjectOwner {
    async fn resolve_owner(&self, resource_id: &str) -> Result<Uuid, AuthError> {
        let id = Uuid::parse_str(resource_id).map_err(|e| {
            debug!(resource_id, "malformed user id");
            AuthError::InvalidArgument(format!("user id: {e}"))
        })?;
        let usr = self.users.query_by_id(id).await?;
        Ok(usr.id)
    }
}
