//! Authorization middleware: applies a rule to the attached identity.

use std::sync::Arc;

use axum::extract::{RawPathParams, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use gatekeep_core::AuthError;
use gatekeep_core::authz::{Authorizer, OwnerResolver, Rule};
use tracing::debug;

use crate::error::AppError;
use crate::extract::Authenticated;

/// A rule plus where to decide it and, optionally, how to find the owner of
/// the resource named in the path.
#[derive(Clone)]
pub struct RuleGuard {
    authorizer: Arc<dyn Authorizer>,
    rule: Rule,
    owner: Option<(&'static str, Arc<dyn OwnerResolver>)>,
}

impl RuleGuard {
    pub fn new(authorizer: Arc<dyn Authorizer>, rule: Rule) -> Self {
        Self {
            authorizer,
            rule,
            owner: None,
        }
    }

    /// Resolve the resource owner from path parameter `param`.
    pub fn with_owner(mut self, param: &'static str, resolver: Arc<dyn OwnerResolver>) -> Self {
        self.owner = Some((param, resolver));
        self
    }
}

/// Axum middleware: denies the request unless the guard's rule allows the
/// attached claims. Must run after an authentication layer.
pub async fn authorize(
    State(guard): State<RuleGuard>,
    Authenticated(ctx): Authenticated,
    params: RawPathParams,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = ctx.claims()?;

    let owner = match &guard.owner {
        Some((param, resolver)) => {
            let resource_id = params
                .iter()
                .find(|(name, _)| name == param)
                .map(|(_, value)| value)
                .ok_or(AuthError::MissingIdentity("resource id"))?;

            let owner = resolver
                .resolve_owner(resource_id)
                .await
                .map_err(|e| match e {
                    AuthError::NotFound(msg) | AuthError::InvalidArgument(msg) => {
                        AuthError::Unauthenticated(msg)
                    }
                    other => other,
                })?;
            Some(owner)
        }
        None => None,
    };

    if let Err(e) = guard.authorizer.authorize(claims, owner, guard.rule).await {
        debug!(rule = %guard.rule, error = %e, "authorization denied");
        return Err(e.into());
    }

    Ok(next.run(request).await)
}
