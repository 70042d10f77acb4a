use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{error::AppError, models::notification::Notification, utils::jwt::Claims};

#[derive(Debug, Deserialize)]
pub struct NotificationListParams {
    /// true to keep only unread notifications.
    pub unread: Option<bool>,
}

/// List the current user's notifications, newest first, with the unread
/// counter.
pub async fn list_notifications(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<NotificationListParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.sub.parse::<i64>().unwrap_or(0);
    let unread_only = params.unread.unwrap_or(false);

    let notifications = sqlx::query_as::<_, Notification>(
        r#"
        SELECT id, user_id, title, message, notification_type, action_url,
               is_read, read_at, created_at
        FROM notifications
        WHERE user_id = ?1
          AND (?2 = 0 OR is_read = 0)
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .bind(unread_only as i64)
    .fetch_all(&pool)
    .await?;

    let unread_count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(serde_json::json!({
        "notifications": notifications,
        "unread_count": unread_count,
    })))
}

/// Mark one notification as read (idempotent; read_at is set once).
pub async fn mark_notification_read(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.sub.parse::<i64>().unwrap_or(0);

    let exists = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM notifications WHERE id = ?1 AND user_id = ?2",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&pool)
    .await?;

    if exists.is_none() {
        return Err(AppError::NotFound("Notification introuvable".to_string()));
    }

    sqlx::query(
        "UPDATE notifications SET is_read = 1, read_at = ?1 WHERE id = ?2 AND is_read = 0",
    )
    .bind(chrono::Utc::now())
    .bind(id)
    .execute(&pool)
    .await?;

    Ok(Json(serde_json::json!({ "is_read": true })))
}
