use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::course::{Course, CourseListParams, CourseSummary, Lesson},
};

/// List published courses (newest first by default).
/// Supports category/difficulty/free/search filters and price sorting.
pub async fn list_courses(
    State(pool): State<SqlitePool>,
    Query(params): Query<CourseListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(20).min(100); // Default 20, max 100

    // The ORDER BY clause cannot be bound, so it is picked from a whitelist.
    let order_clause = match params.sort.as_deref() {
        Some("oldest") => "c.created_at ASC",
        Some("price_low") => "c.price ASC",
        Some("price_high") => "c.price DESC",
        _ => "c.created_at DESC",
    };

    let free_only = params.free.as_deref() == Some("true");
    let search_pattern = params.search.as_ref().map(|s| format!("%{}%", s));

    let sql = format!(
        r#"
        SELECT
            c.id, c.title, c.slug, c.short_description, c.difficulty,
            c.is_free, c.price, c.created_at,
            cat.name AS category_name,
            (SELECT COUNT(*) FROM lessons l WHERE l.course_id = c.id AND l.is_published = 1) AS lessons_count
        FROM courses c
        JOIN categories cat ON c.category_id = cat.id
        WHERE c.is_published = 1
          AND (?1 IS NULL OR cat.slug = ?1)
          AND (?2 IS NULL OR c.difficulty = ?2)
          AND (?3 = 0 OR c.is_free = 1)
          AND (?4 IS NULL OR c.title LIKE ?4 OR c.description LIKE ?4 OR c.short_description LIKE ?4)
        ORDER BY {}
        LIMIT ?5
        "#,
        order_clause
    );

    let courses = sqlx::query_as::<_, CourseSummary>(&sql)
        .bind(&params.category)
        .bind(&params.difficulty)
        .bind(free_only as i64)
        .bind(&search_pattern)
        .bind(limit)
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list courses: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(courses))
}

/// Get a published course by slug, with its ordered published lessons.
pub async fn get_course(
    State(pool): State<SqlitePool>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let course = sqlx::query_as::<_, Course>(
        r#"
        SELECT id, category_id, instructor_id, title, slug, short_description,
               description, difficulty, is_free, price, is_published, created_at
        FROM courses
        WHERE slug = ?1 AND is_published = 1
        "#,
    )
    .bind(&slug)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Cours introuvable".to_string()))?;

    let lessons = sqlx::query_as::<_, Lesson>(
        r#"
        SELECT id, course_id, title, slug, lesson_type, content, video_url,
               duration_minutes, position, is_preview, is_published, created_at
        FROM lessons
        WHERE course_id = ?1 AND is_published = 1
        ORDER BY position
        "#,
    )
    .bind(course.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(serde_json::json!({
        "course": course,
        "lessons": lessons,
    })))
}
