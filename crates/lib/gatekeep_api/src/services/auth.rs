//! Authentication flows run after a strategy has identified the caller.

use gatekeep_core::AuthError;
use gatekeep_core::models::UpdateUser;
use gatekeep_core::strategy::IdentityContext;
use tracing::{info, warn};

use crate::AppState;
use crate::error::AppResult;
use crate::models::{ResetPasswordRequest, TokenResponse};

/// Sign the strategy's claims with `kid`. The paired refresh secret is
/// returned but not persisted, so it cannot be redeemed.
pub fn issue_token(state: &AppState, ctx: &IdentityContext, kid: &str) -> AppResult<TokenResponse> {
    let pair = state.tokens.issue(kid, ctx.claims()?)?;
    Ok(TokenResponse {
        token: pair.token,
        refresh_token: pair.refresh_token,
    })
}

/// Issue a session token and make its refresh secret the principal's live
/// one, replacing any previous secret.
pub async fn login(state: &AppState, ctx: &IdentityContext) -> AppResult<TokenResponse> {
    let kid = state.tokens.active_kid()?;
    let pair = state.tokens.issue(kid, ctx.claims()?)?;

    let usr = state.users.query_by_id(ctx.user_id()?).await?;
    let change = UpdateUser {
        refresh_secret: Some(pair.refresh_token.clone()),
        ..Default::default()
    };
    let usr = state.users.update(usr, change, ctx.at).await?;

    info!(user_id = %usr.id, kid, "login");
    Ok(TokenResponse {
        token: pair.token,
        refresh_token: pair.refresh_token,
    })
}

/// Issue renewed credentials and rotate the refresh secret away from
/// `presented`. Loses with `Unauthenticated` if another refresh rotated it
/// first.
pub async fn refresh(
    state: &AppState,
    ctx: &IdentityContext,
    presented: &str,
) -> AppResult<TokenResponse> {
    let kid = state.tokens.active_kid()?;
    let pair = state.tokens.issue(kid, ctx.claims()?)?;

    let usr = state
        .users
        .query_by_id(ctx.user_id()?)
        .await
        .map_err(AuthError::into_unauthenticated)?;
    let usr = state
        .users
        .rotate_refresh(usr, presented, &pair.refresh_token, ctx.at)
        .await?;

    info!(user_id = %usr.id, kid, "refresh");
    Ok(TokenResponse {
        token: pair.token,
        refresh_token: pair.refresh_token,
    })
}

/// Issue a reset secret if `email` belongs to a principal. Never reports
/// whether it did.
pub async fn forgot_password(state: &AppState, email: &str, now: chrono::DateTime<chrono::Utc>) {
    match state.resets.create(email, now).await {
        Ok(Some(_)) | Ok(None) => {}
        Err(e) => warn!(error = %e, "could not issue reset secret"),
    }
}

/// Change the password of the reset secret's owner, then burn the secret.
pub async fn reset_password(
    state: &AppState,
    ctx: &IdentityContext,
    reset_token: &str,
    req: ResetPasswordRequest,
) -> AppResult<()> {
    let secret = state
        .resets
        .lookup_by_token(reset_token, ctx.at)
        .await
        .map_err(AuthError::into_unauthenticated)?;

    let usr = state
        .users
        .query_by_id(ctx.user_id()?)
        .await
        .map_err(AuthError::into_unauthenticated)?;
    if usr.email != secret.email {
        return Err(AuthError::unauthenticated("reset secret issued to another principal").into());
    }

    let change = UpdateUser {
        password: Some(req.password),
        password_confirm: Some(req.password_confirm),
        ..Default::default()
    };
    let usr = state.users.update(usr, change, ctx.at).await?;
    state.resets.invalidate(&secret).await?;

    info!(user_id = %usr.id, "password reset");
    Ok(())
}
