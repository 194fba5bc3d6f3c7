//! Request middleware.
//!
//! Dependent services mount the same layers as the identity service, fed
//! with a `RemoteStrategy` and a `RemoteAuthorizer`.

pub mod authen;
pub mod authorize;

use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn_with_state;
use gatekeep_core::strategy::AuthStrategy;

pub use authen::authenticate;
pub use authorize::{RuleGuard, authorize};

/// Authenticate every route of `router` with `strategy`.
///
/// Apply after [`with_rule`] so the strategy runs first.
pub fn with_strategy<S>(router: Router<S>, strategy: Arc<dyn AuthStrategy>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(from_fn_with_state(strategy, authenticate))
}

/// Guard every route of `router` with `guard`.
pub fn with_rule<S>(router: Router<S>, guard: RuleGuard) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(from_fn_with_state(guard, authorize))
}
