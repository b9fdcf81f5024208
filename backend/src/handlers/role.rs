//! HTTP handlers for role management endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::role::{
    CreateRoleInput, Permission, Role, RoleService, RoleWithPermissions, UpdateRoleInput,
};
use crate::AppState;

/// List all roles
pub async fn list_roles(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Role>>> {
    check_permission(&current_user.0, "roles", "manage")?;
    let service = RoleService::new(state.db);
    let roles = service.get_roles().await?;
    Ok(Json(roles))
}

/// List all available permissions
pub async fn list_permissions(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Permission>>> {
    check_permission(&current_user.0, "roles", "manage")?;
    let service = RoleService::new(state.db);
    let permissions = service.list_permissions().await?;
    Ok(Json(permissions))
}

/// Get a role with its permissions
pub async fn get_role(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(role_id): Path<Uuid>,
) -> AppResult<Json<RoleWithPermissions>> {
    check_permission(&current_user.0, "roles", "manage")?;
    let service = RoleService::new(state.db);
    let role = service.get_role_with_permissions(role_id).await?;
    Ok(Json(role))
}

/// Create a custom role
pub async fn create_role(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateRoleInput>,
) -> AppResult<Json<RoleWithPermissions>> {
    check_permission(&current_user.0, "roles", "manage")?;
    let service = RoleService::new(state.db);
    let role = service.create_role(input).await?;
    Ok(Json(role))
}

/// Update a custom role
pub async fn update_role(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(role_id): Path<Uuid>,
    Json(input): Json<UpdateRoleInput>,
) -> AppResult<Json<RoleWithPermissions>> {
    check_permission(&current_user.0, "roles", "manage")?;
    let service = RoleService::new(state.db);
    let role = service.update_role(role_id, input).await?;
    Ok(Json(role))
}

/// Delete a custom role
pub async fn delete_role(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(role_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    check_permission(&current_user.0, "roles", "manage")?;
    let service = RoleService::new(state.db);
    service.delete_role(role_id).await?;
    Ok(Json(()))
}
