//! Principal administration.

use gatekeep_core::AuthError;
use gatekeep_core::role::{Role, has_role};
use gatekeep_core::strategy::IdentityContext;
use uuid::Uuid;

use crate::AppState;
use crate::error::AppResult;
use crate::models::{NewUserRequest, UpdateUserRequest, UserResponse};

pub async fn create(
    state: &AppState,
    ctx: &IdentityContext,
    req: NewUserRequest,
) -> AppResult<UserResponse> {
    let usr = state.users.create(req.into(), ctx.at).await?;
    Ok(usr.into())
}

pub async fn get(state: &AppState, id: Uuid) -> AppResult<UserResponse> {
    Ok(state.users.query_by_id(id).await?.into())
}

/// Apply `req` to principal `id`. Only admins may change roles or the
/// enabled flag.
pub async fn update(
    state: &AppState,
    ctx: &IdentityContext,
    id: Uuid,
    req: UpdateUserRequest,
) -> AppResult<UserResponse> {
    let admin = has_role(&ctx.claims()?.roles, Role::Admin);
    if req.roles.is_some() && !admin {
        return Err(AuthError::unauthenticated("role changes require admin").into());
    }
    if req.enabled.is_some() && !admin {
        return Err(AuthError::unauthenticated("enabling or disabling requires admin").into());
    }

    let usr = state.users.query_by_id(id).await?;
    let usr = state.users.update(usr, req.into(), ctx.at).await?;
    Ok(usr.into())
}

pub async fn delete(state: &AppState, id: Uuid) -> AppResult<()> {
    let usr = state.users.query_by_id(id).await?;
    state.users.delete(&usr).await?;
    Ok(())
}
