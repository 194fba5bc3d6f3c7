//! Authentication middleware: runs one strategy and attaches its identity.

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::extract::{RawPathParams, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use gatekeep_core::strategy::api_key::API_KEY_HEADER;
use gatekeep_core::strategy::{AuthRequest, AuthStrategy};
use tracing::debug;

use crate::error::AppError;
use crate::routes::RESET_TOKEN_PARAM;

/// Largest body a strategy will buffer.
pub const MAX_AUTH_BODY: usize = 64 * 1024;

/// Axum middleware: authenticates the request with `strategy` and inserts the
/// resulting [`IdentityContext`] into request extensions. The body is
/// buffered and handed on unchanged.
///
/// Mount with `route_layer` so path parameters are visible.
///
/// [`IdentityContext`]: gatekeep_core::strategy::IdentityContext
pub async fn authenticate(
    State(strategy): State<Arc<dyn AuthStrategy>>,
    params: RawPathParams,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = request.into_parts();
    let body = to_bytes(body, MAX_AUTH_BODY)
        .await
        .map_err(|e| AppError::BadRequest(format!("request body: {e}")))?;

    let header = |name: &'static str| parts.headers.get(name).and_then(|v| v.to_str().ok());
    let path_token = params
        .iter()
        .find(|(name, _)| *name == RESET_TOKEN_PARAM)
        .map(|(_, value)| value);

    let req = AuthRequest {
        authorization: header(AUTHORIZATION.as_str()),
        api_key: header(API_KEY_HEADER),
        path_token,
        body: &body,
        now: Utc::now(),
    };

    let ctx = match strategy.authenticate(&req).await {
        Ok(ctx) => ctx,
        Err(e) => {
            debug!(strategy = strategy.name(), error = %e, "authentication failed");
            return Err(e.into());
        }
    };

    parts.extensions.insert(ctx);
    Ok(next.run(Request::from_parts(parts, Body::from(body))).await)
}
