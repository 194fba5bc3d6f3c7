//! Authentication request handlers.
//!
//! Each route sits behind the strategy named in its doc comment; by the time
//! a handler runs, the caller is identified.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::{Authenticated, ValidJson};
use crate::models::{
    AuthenticateResponse, AuthorizeRequest, ForgotPasswordRequest, RefreshRequest,
    ResetPasswordRequest, TokenResponse,
};
use crate::services::auth;

/// `GET /v1/auth/token/{kid}` (basic): a long-lived token signed with `kid`.
pub async fn token_handler(
    State(state): State<AppState>,
    Path(kid): Path<String>,
    Authenticated(ctx): Authenticated,
) -> AppResult<Json<TokenResponse>> {
    Ok(Json(auth::issue_token(&state, &ctx, &kid)?))
}

/// `POST /v1/auth/login` (login).
pub async fn login_handler(
    State(state): State<AppState>,
    Authenticated(ctx): Authenticated,
) -> AppResult<Json<TokenResponse>> {
    Ok(Json(auth::login(&state, &ctx).await?))
}

/// `POST /v1/auth/refresh` (refresh).
pub async fn refresh_handler(
    State(state): State<AppState>,
    Authenticated(ctx): Authenticated,
    ValidJson(body): ValidJson<RefreshRequest>,
) -> AppResult<Json<TokenResponse>> {
    Ok(Json(auth::refresh(&state, &ctx, &body.refresh_token).await?))
}

/// `POST /v1/auth/forgot` (public). Always 204.
pub async fn forgot_handler(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<ForgotPasswordRequest>,
) -> StatusCode {
    auth::forgot_password(&state, &body.email, Utc::now()).await;
    StatusCode::NO_CONTENT
}

/// `POST /v1/auth/reset-password/{reset_token}` (reset).
pub async fn reset_password_handler(
    State(state): State<AppState>,
    Path(reset_token): Path<String>,
    Authenticated(ctx): Authenticated,
    ValidJson(body): ValidJson<ResetPasswordRequest>,
) -> AppResult<StatusCode> {
    auth::reset_password(&state, &ctx, &reset_token, body).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /v1/auth/authenticate` (bearer): echo the verified identity for
/// delegating services.
pub async fn authenticate_handler(
    Authenticated(ctx): Authenticated,
) -> AppResult<Json<AuthenticateResponse>> {
    Ok(Json(AuthenticateResponse {
        user_id: ctx.user_id()?,
        claims: ctx.claims()?.clone(),
    }))
}

/// `GET /v1/auth/authenticate-api` (API key).
pub async fn authenticate_api_handler(Authenticated(_ctx): Authenticated) -> StatusCode {
    StatusCode::NO_CONTENT
}

/// `POST /v1/auth/authorize` (public): decide a rule for delegating services.
pub async fn authorize_handler(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<AuthorizeRequest>,
) -> AppResult<StatusCode> {
    state
        .authorizer
        .authorize(&body.claims, body.user_id, body.rule)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
