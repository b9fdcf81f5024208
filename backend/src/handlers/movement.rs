//! HTTP handlers for stock movement endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::models::{total_cost, total_price, total_quantity, LineItem, MovementType};
use crate::services::movement::{
    Movement, MovementPatch, MovementService, ReconciliationInput, RegisterMovementInput,
};
use crate::AppState;

/// Movement response with derived totals
#[derive(Debug, serde::Serialize)]
pub struct MovementResponse {
    #[serde(flatten)]
    pub movement: Movement,
    pub total_items: usize,
    pub total_quantity: i64,
    pub total_cost: Decimal,
    pub total_price: Decimal,
}

impl From<Movement> for MovementResponse {
    fn from(movement: Movement) -> Self {
        let items = &movement.line_items.0;
        Self {
            total_items: items.len(),
            total_quantity: total_quantity(items),
            total_cost: total_cost(items),
            total_price: total_price(items),
            movement,
        }
    }
}

/// Request body for editing a movement. Type and line items, when present,
/// only drive stock reconciliation; destination is the persisted field.
#[derive(Debug, serde::Deserialize)]
pub struct UpdateMovementRequest {
    pub destination: Option<String>,
    pub movement_type: Option<MovementType>,
    pub line_items: Option<Vec<LineItem>>,
}

/// Register a stock movement
pub async fn register_movement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RegisterMovementInput>,
) -> AppResult<Json<MovementResponse>> {
    check_permission(&current_user.0, "movements", "create")?;
    let service = MovementService::new(state.db.clone(), &state.config);
    let movement = service.register(current_user.0.user_id, input).await?;
    Ok(Json(movement.into()))
}

/// List movements
pub async fn list_movements(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<MovementResponse>>> {
    check_permission(&current_user.0, "movements", "read")?;
    let service = MovementService::new(state.db.clone(), &state.config);
    let movements = service.list().await?;
    Ok(Json(movements.into_iter().map(Into::into).collect()))
}

/// Get a movement by id
pub async fn get_movement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(movement_id): Path<Uuid>,
) -> AppResult<Json<MovementResponse>> {
    check_permission(&current_user.0, "movements", "read")?;
    let service = MovementService::new(state.db.clone(), &state.config);
    let movement = service.get(movement_id).await?;
    Ok(Json(movement.into()))
}

/// Edit a movement
pub async fn update_movement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(movement_id): Path<Uuid>,
    Json(body): Json<UpdateMovementRequest>,
) -> AppResult<Json<MovementResponse>> {
    check_permission(&current_user.0, "movements", "update")?;

    let patch = MovementPatch {
        destination: body.destination,
    };
    let reconcile = if body.movement_type.is_some() || body.line_items.is_some() {
        Some(ReconciliationInput {
            movement_type: body.movement_type,
            line_items: body.line_items,
        })
    } else {
        None
    };

    let service = MovementService::new(state.db.clone(), &state.config);
    let movement = service.update(movement_id, patch, reconcile).await?;
    Ok(Json(movement.into()))
}

/// Deactivate a movement, reversing its stock effect
pub async fn deactivate_movement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(movement_id): Path<Uuid>,
) -> AppResult<Json<MovementResponse>> {
    check_permission(&current_user.0, "movements", "update")?;
    let service = MovementService::new(state.db.clone(), &state.config);
    let movement = service.deactivate(movement_id).await?;
    Ok(Json(movement.into()))
}

/// Reactivate a movement, reapplying its stock effect
pub async fn reactivate_movement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(movement_id): Path<Uuid>,
) -> AppResult<Json<MovementResponse>> {
    check_permission(&current_user.0, "movements", "update")?;
    let service = MovementService::new(state.db.clone(), &state.config);
    let movement = service.reactivate(movement_id).await?;
    Ok(Json(movement.into()))
}

/// Delete a movement, reversing its stock effect
pub async fn delete_movement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(movement_id): Path<Uuid>,
) -> AppResult<Json<MovementResponse>> {
    check_permission(&current_user.0, "movements", "delete")?;
    let service = MovementService::new(state.db.clone(), &state.config);
    let movement = service.delete(movement_id).await?;
    Ok(Json(movement.into()))
}
