use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    error::{AppError, is_unique_violation},
    models::{
        enrollment::{MyCourseRow, MyCoursesParams},
        notification::Notification,
    },
    progress,
    utils::jwt::Claims,
};

/// Enroll the current user in a free course.
/// Paid courses go through the payment collaborator, not this endpoint.
pub async fn enroll_course(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.sub.parse::<i64>().unwrap_or(0);

    let course = sqlx::query_as::<_, (i64, bool, String)>(
        "SELECT id, is_free, title FROM courses WHERE slug = ?1 AND is_published = 1",
    )
    .bind(&slug)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Cours introuvable".to_string()))?;

    let (course_id, is_free, _title) = course;

    if !is_free {
        return Err(AppError::BadRequest(
            "Veuillez procéder au paiement pour accéder à ce cours".to_string(),
        ));
    }

    let enrollment_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO enrollments (user_id, course_id, enrolled_at) VALUES (?1, ?2, ?3) RETURNING id",
    )
    .bind(user_id)
    .bind(course_id)
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            return AppError::Conflict("Vous êtes déjà inscrit à ce cours".to_string());
        }
        tracing::error!("Failed to create enrollment: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": enrollment_id })),
    ))
}

/// The current user's enrollments with course info and summary counters.
pub async fn my_courses(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<MyCoursesParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.sub.parse::<i64>().unwrap_or(0);

    let (total_enrollments, completed_count) = sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT COUNT(*),
               COALESCE(SUM(is_completed), 0)
        FROM enrollments
        WHERE user_id = ?1
        "#,
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    // 'all' unless a recognized status filter is given.
    let status_filter = match params.status.as_deref() {
        Some("completed") => Some(1i64),
        Some("in_progress") => Some(0i64),
        _ => None,
    };

    let enrollments = sqlx::query_as::<_, MyCourseRow>(
        r#"
        SELECT
            e.id AS enrollment_id, c.id AS course_id, c.title, c.slug,
            c.short_description, c.difficulty, e.progress_percentage,
            e.is_completed, e.enrolled_at, e.completed_at
        FROM enrollments e
        JOIN courses c ON e.course_id = c.id
        WHERE e.user_id = ?1
          AND (?2 IS NULL OR e.is_completed = ?2)
        ORDER BY e.enrolled_at DESC
        "#,
    )
    .bind(user_id)
    .bind(status_filter)
    .fetch_all(&pool)
    .await?;

    Ok(Json(serde_json::json!({
        "enrollments": enrollments,
        "total_enrollments": total_enrollments,
        "completed_count": completed_count,
        "in_progress_count": total_enrollments - completed_count,
    })))
}

/// Mark a lesson complete for the current user (idempotent) and recompute
/// the enrollment's progress.
pub async fn complete_lesson(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path((course_slug, lesson_slug)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.sub.parse::<i64>().unwrap_or(0);

    let course_id =
        sqlx::query_scalar::<_, i64>("SELECT id FROM courses WHERE slug = ?1")
            .bind(&course_slug)
            .fetch_optional(&pool)
            .await?
            .ok_or(AppError::NotFound("Cours introuvable".to_string()))?;

    let lesson_id = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM lessons WHERE course_id = ?1 AND slug = ?2",
    )
    .bind(course_id)
    .bind(&lesson_slug)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Leçon introuvable".to_string()))?;

    let enrollment_id = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM enrollments WHERE user_id = ?1 AND course_id = ?2",
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotEnrolled)?;

    let mut tx = pool.begin().await?;

    let newly_completed = progress::complete_lesson(&mut *tx, enrollment_id, lesson_id).await?;

    if !newly_completed {
        tx.rollback().await?;
        let percentage = sqlx::query_scalar::<_, i64>(
            "SELECT progress_percentage FROM enrollments WHERE id = ?1",
        )
        .bind(enrollment_id)
        .fetch_one(&pool)
        .await?;
        return Ok(Json(serde_json::json!({
            "message": "Déjà terminée",
            "course_progress": percentage,
        })));
    }

    let update = progress::update_enrollment_progress(&mut *tx, enrollment_id).await?;

    tx.commit().await?;

    // Event sink, best-effort once the transaction is committed.
    notify_completion(&pool, user_id, &course_slug, update.course_completed).await;

    Ok(Json(serde_json::json!({
        "message": "Leçon terminée!",
        "course_progress": update.percentage,
    })))
}

/// Emits the lesson-completed notification, and the certificate one when the
/// course just reached 100%. Failures are logged, never surfaced.
pub(crate) async fn notify_completion(
    pool: &SqlitePool,
    user_id: i64,
    course_slug: &str,
    course_completed: bool,
) {
    let action_url = format!("/courses/{}", course_slug);

    if let Err(e) = Notification::create(
        pool,
        user_id,
        "Leçon terminée",
        "Vous avez terminé une leçon. Continuez sur votre lancée!",
        "lesson_completed",
        &action_url,
    )
    .await
    {
        tracing::warn!("Failed to create lesson_completed notification: {:?}", e);
    }

    if course_completed {
        if let Err(e) = Notification::create(
            pool,
            user_id,
            "Certificat disponible",
            "Félicitations, vous avez terminé le cours! Votre certificat est disponible.",
            "certificate",
            &format!("/certificates/{}", course_slug),
        )
        .await
        {
            tracing::warn!("Failed to create certificate notification: {:?}", e);
        }
    }
}
