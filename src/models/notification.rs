// src/models/notification.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite, SqlitePool};

/// Represents the 'notifications' table. This is the event sink the core
/// feeds on lesson/course completion; delivery (email, push) is handled by
/// an external collaborator.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub message: String,

    /// e.g. 'lesson_completed', 'certificate', 'course_new', 'system'.
    pub notification_type: String,

    pub action_url: String,
    pub is_read: bool,
    pub read_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Notification {
    /// Inserts a notification for one user.
    pub async fn create(
        pool: &SqlitePool,
        user_id: i64,
        title: &str,
        message: &str,
        notification_type: &str,
        action_url: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO notifications (user_id, title, message, notification_type, action_url, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(message)
        .bind(notification_type)
        .bind(action_url)
        .bind(chrono::Utc::now())
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Inserts the same notification for a set of users in one statement.
    /// Used for fan-out events (e.g. a new lesson published to a cohort).
    pub async fn create_bulk(
        pool: &SqlitePool,
        user_ids: &[i64],
        title: &str,
        message: &str,
        notification_type: &str,
        action_url: &str,
    ) -> Result<(), sqlx::Error> {
        if user_ids.is_empty() {
            return Ok(());
        }

        let now = chrono::Utc::now();
        let mut query_builder = sqlx::QueryBuilder::<Sqlite>::new(
            "INSERT INTO notifications (user_id, title, message, notification_type, action_url, created_at) ",
        );
        query_builder.push_values(user_ids, |mut b, user_id| {
            b.push_bind(user_id)
                .push_bind(title)
                .push_bind(message)
                .push_bind(notification_type)
                .push_bind(action_url)
                .push_bind(now);
        });

        query_builder.build().execute(pool).await?;

        Ok(())
    }
}
