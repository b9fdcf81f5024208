//! HTTP handlers for product catalog endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::product::{CreateProductInput, Product, ProductService, UpdateProductInput};
use crate::AppState;

/// Query parameters for listing products
#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

/// Create a product
pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> AppResult<Json<Product>> {
    check_permission(&current_user.0, "products", "create")?;
    let service = ProductService::new(state.db);
    let product = service.create(input).await?;
    Ok(Json(product))
}

/// List products
pub async fn list_products(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListProductsQuery>,
) -> AppResult<Json<Vec<Product>>> {
    check_permission(&current_user.0, "products", "read")?;
    let service = ProductService::new(state.db);
    let products = service.list(query.include_inactive).await?;
    Ok(Json(products))
}

/// Get a product by id
pub async fn get_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    check_permission(&current_user.0, "products", "read")?;
    let service = ProductService::new(state.db);
    let product = service.get(product_id).await?;
    Ok(Json(product))
}

/// Get a product by its code
pub async fn get_product_by_code(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(code): Path<String>,
) -> AppResult<Json<Product>> {
    check_permission(&current_user.0, "products", "read")?;
    let service = ProductService::new(state.db);
    let product = service.get_by_code(&code).await?;
    Ok(Json(product))
}

/// Update a product
pub async fn update_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<Product>> {
    check_permission(&current_user.0, "products", "update")?;
    let service = ProductService::new(state.db);
    let product = service.update(product_id, input).await?;
    Ok(Json(product))
}

/// List products at or below their minimum stock
pub async fn list_low_stock_products(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Product>>> {
    check_permission(&current_user.0, "products", "read")?;
    let service = ProductService::new(state.db);
    let products = service.low_stock().await?;
    Ok(Json(products))
}
