//! HTTP handlers for supplier endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::supplier::{
    CreateSupplierInput, Supplier, SupplierService, UpdateSupplierInput,
};
use crate::AppState;

/// Query parameters for listing suppliers
#[derive(Debug, Deserialize)]
pub struct ListSuppliersQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

/// Create a supplier
pub async fn create_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateSupplierInput>,
) -> AppResult<Json<Supplier>> {
    check_permission(&current_user.0, "suppliers", "create")?;
    let service = SupplierService::new(state.db);
    let supplier = service.create(input).await?;
    Ok(Json(supplier))
}

/// List suppliers
pub async fn list_suppliers(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListSuppliersQuery>,
) -> AppResult<Json<Vec<Supplier>>> {
    check_permission(&current_user.0, "suppliers", "read")?;
    let service = SupplierService::new(state.db);
    let suppliers = service.list(query.include_inactive).await?;
    Ok(Json(suppliers))
}

/// Get a supplier by id
pub async fn get_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<Json<Supplier>> {
    check_permission(&current_user.0, "suppliers", "read")?;
    let service = SupplierService::new(state.db);
    let supplier = service.get(supplier_id).await?;
    Ok(Json(supplier))
}

/// Update a supplier
pub async fn update_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(supplier_id): Path<Uuid>,
    Json(input): Json<UpdateSupplierInput>,
) -> AppResult<Json<Supplier>> {
    check_permission(&current_user.0, "suppliers", "update")?;
    let service = SupplierService::new(state.db);
    let supplier = service.update(supplier_id, input).await?;
    Ok(Json(supplier))
}
