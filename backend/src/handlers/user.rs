//! HTTP handlers for user management endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::user::{CreateUserInput, UpdateUserInput, UserRecord, UserService};
use crate::AppState;

/// Create a user
pub async fn create_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateUserInput>,
) -> AppResult<Json<UserRecord>> {
    check_permission(&current_user.0, "users", "manage")?;
    let service = UserService::new(state.db);
    let user = service.create(input).await?;
    Ok(Json(user))
}

/// List users
pub async fn list_users(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<UserRecord>>> {
    check_permission(&current_user.0, "users", "manage")?;
    let service = UserService::new(state.db);
    let users = service.list().await?;
    Ok(Json(users))
}

/// Get a user by id
pub async fn get_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<UserRecord>> {
    check_permission(&current_user.0, "users", "manage")?;
    let service = UserService::new(state.db);
    let user = service.get(user_id).await?;
    Ok(Json(user))
}

/// Get the authenticated user's own record
pub async fn get_me(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<UserRecord>> {
    let service = UserService::new(state.db);
    let user = service.get(current_user.0.user_id).await?;
    Ok(Json(user))
}

/// Update a user
pub async fn update_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(input): Json<UpdateUserInput>,
) -> AppResult<Json<UserRecord>> {
    check_permission(&current_user.0, "users", "manage")?;
    let service = UserService::new(state.db);
    let user = service.update(user_id, input).await?;
    Ok(Json(user))
}
