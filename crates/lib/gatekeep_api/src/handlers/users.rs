//! Principal administration handlers (bearer, rule-guarded).

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use uuid::Uuid;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::{Authenticated, ValidJson};
use crate::models::{NewUserRequest, UpdateUserRequest, UserResponse};
use crate::services::users;

/// `POST /v1/users` (admin only).
pub async fn create_user_handler(
    State(state): State<AppState>,
    Authenticated(ctx): Authenticated,
    ValidJson(body): ValidJson<NewUserRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let usr = users::create(&state, &ctx, body).await?;
    Ok((StatusCode::CREATED, Json(usr)))
}

/// `GET /v1/users/{user_id}` (admin or subject).
pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<UserResponse>> {
    Ok(Json(users::get(&state, user_id).await?))
}

/// `PUT /v1/users/{user_id}` (admin or subject).
pub async fn update_user_handler(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Authenticated(ctx): Authenticated,
    ValidJson(body): ValidJson<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    Ok(Json(users::update(&state, &ctx, user_id, body).await?))
}

/// `DELETE /v1/users/{user_id}` (admin only).
pub async fn delete_user_handler(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    users::delete(&state, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
