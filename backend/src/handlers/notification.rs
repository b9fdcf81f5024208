//! HTTP handlers for notification endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::notification::{NotificationService, ProcessQueueResult, QueuedNotification};
use crate::AppState;

/// List the authenticated user's notifications
pub async fn get_notifications(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<QueuedNotification>>> {
    check_permission(&current_user.0, "notifications", "read")?;
    let service = NotificationService::new(state.db.clone(), &state.config);
    let notifications = service.list_for_user(current_user.0.user_id).await?;
    Ok(Json(notifications))
}

/// Mark one of the user's notifications as read
pub async fn mark_notification_read(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    check_permission(&current_user.0, "notifications", "read")?;
    let service = NotificationService::new(state.db.clone(), &state.config);
    service
        .mark_read(current_user.0.user_id, notification_id)
        .await?;
    Ok(Json(()))
}

/// Retry delivery of queued notifications
pub async fn process_notification_queue(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<ProcessQueueResult>> {
    check_permission(&current_user.0, "notifications", "process")?;
    let service = NotificationService::new(state.db.clone(), &state.config);
    let result = service.process_queue().await?;
    Ok(Json(result))
}
