//! Axum route handlers for the Notifications API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::notification::NotificationRow;
use crate::notifications::{list_notifications, mark_read};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<NotificationRow>,
    pub unread_count: usize,
}

/// GET /api/v1/notifications/:user_id
pub async fn handle_list_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<NotificationListResponse>, AppError> {
    let notifications = list_notifications(&state.db, user_id).await?;
    let unread_count = notifications.iter().filter(|n| !n.is_read).count();

    Ok(Json(NotificationListResponse {
        notifications,
        unread_count,
    }))
}

/// PATCH /api/v1/notifications/:id/read
pub async fn handle_mark_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let updated = mark_read(&state.db, id).await?;
    if !updated {
        return Err(AppError::NotFound(format!("Notification {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}
