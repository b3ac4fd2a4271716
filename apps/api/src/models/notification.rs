use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A persisted in-app notification. Created once per bulk-upload job on both
/// the completion and fatal-failure paths; mutated only when the recipient
/// marks it read.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NotificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub job_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
