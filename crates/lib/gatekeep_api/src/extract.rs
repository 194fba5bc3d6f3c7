//! Request extractors.

use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use gatekeep_core::AuthError;
use gatekeep_core::strategy::IdentityContext;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::AppError;

/// JSON body that is deserialized and then validated. Both failures are
/// `InvalidArgument` in the usual error shape.
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = <Json<T> as FromRequest<S>>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        data.validate().map_err(AuthError::from)?;
        Ok(Self(data))
    }
}

/// The identity attached by the authentication middleware.
///
/// Missing on a route means the route was mounted without a strategy, which
/// surfaces as `DataLoss`.
#[derive(Debug, Clone)]
pub struct Authenticated(pub IdentityContext);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<IdentityContext>()
            .cloned()
            .map(Authenticated)
            .ok_or_else(|| AuthError::MissingIdentity("identity context").into())
    }
}
