//! Persisted in-app notifications.

pub mod handlers;

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::notification::NotificationRow;

pub const TYPE_BULK_UPLOAD_COMPLETED: &str = "bulk_upload_completed";
pub const TYPE_BULK_UPLOAD_FAILED: &str = "bulk_upload_failed";

pub async fn create_notification(
    pool: &PgPool,
    user_id: Uuid,
    notification_type: &str,
    title: &str,
    message: &str,
    job_id: Option<Uuid>,
) -> Result<Uuid, sqlx::Error> {
    Ok(sqlx::query_scalar(
        r#"
        INSERT INTO notifications (id, user_id, notification_type, title, message, job_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(notification_type)
    .bind(title)
    .bind(message)
    .bind(job_id)
    .fetch_one(pool)
    .await?)
}

/// Newest first.
pub async fn list_notifications(pool: &PgPool, user_id: Uuid) -> Result<Vec<NotificationRow>, sqlx::Error> {
    Ok(sqlx::query_as::<_, NotificationRow>(
        "SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

/// Marks a notification read. Returns false if the row does not exist.
pub async fn mark_read(pool: &PgPool, notification_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1")
        .bind(notification_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
