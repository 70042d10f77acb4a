// src/progress.rs
//
// Lesson completion and enrollment-wide progress recomputation. Both run on
// a borrowed connection so callers can keep them inside their transaction
// (the pass cascade must commit atomically with the attempt finalization).

use chrono::Utc;
use sqlx::SqliteConnection;

/// Result of an enrollment progress recomputation.
#[derive(Debug, Clone, Copy)]
pub struct ProgressUpdate {
    pub percentage: i64,
    /// True only when this recomputation latched the enrollment to completed.
    pub course_completed: bool,
}

/// Get-or-create the LessonProgress row and mark it completed.
/// Returns true when the lesson was newly completed, false when it already
/// was (idempotent).
pub async fn complete_lesson(
    conn: &mut SqliteConnection,
    enrollment_id: i64,
    lesson_id: i64,
) -> Result<bool, sqlx::Error> {
    let existing = sqlx::query_scalar::<_, bool>(
        "SELECT is_completed FROM lesson_progress WHERE enrollment_id = ?1 AND lesson_id = ?2",
    )
    .bind(enrollment_id)
    .bind(lesson_id)
    .fetch_optional(&mut *conn)
    .await?;

    match existing {
        Some(true) => Ok(false),
        Some(false) => {
            sqlx::query(
                "UPDATE lesson_progress SET is_completed = 1, completed_at = ?1
                 WHERE enrollment_id = ?2 AND lesson_id = ?3",
            )
            .bind(Utc::now())
            .bind(enrollment_id)
            .bind(lesson_id)
            .execute(&mut *conn)
            .await?;
            Ok(true)
        }
        None => {
            sqlx::query(
                "INSERT INTO lesson_progress (enrollment_id, lesson_id, is_completed, completed_at)
                 VALUES (?1, ?2, 1, ?3)",
            )
            .bind(enrollment_id)
            .bind(lesson_id)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;
            Ok(true)
        }
    }
}

/// Recomputes the enrollment's progress percentage (floor of
/// completed / total lessons) and latches is_completed at 100%, once.
/// A course without lessons leaves the stored percentage unchanged.
pub async fn update_enrollment_progress(
    conn: &mut SqliteConnection,
    enrollment_id: i64,
) -> Result<ProgressUpdate, sqlx::Error> {
    let total_lessons = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM lessons
         WHERE course_id = (SELECT course_id FROM enrollments WHERE id = ?1)",
    )
    .bind(enrollment_id)
    .fetch_one(&mut *conn)
    .await?;

    if total_lessons == 0 {
        let percentage = sqlx::query_scalar::<_, i64>(
            "SELECT progress_percentage FROM enrollments WHERE id = ?1",
        )
        .bind(enrollment_id)
        .fetch_one(&mut *conn)
        .await?;
        return Ok(ProgressUpdate {
            percentage,
            course_completed: false,
        });
    }

    let completed_lessons = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM lesson_progress
         WHERE enrollment_id = ?1 AND is_completed = 1",
    )
    .bind(enrollment_id)
    .fetch_one(&mut *conn)
    .await?;

    // Integer division floors, matching the stored percentage contract.
    let percentage = completed_lessons * 100 / total_lessons;

    let mut course_completed = false;
    if percentage == 100 {
        let newly = sqlx::query(
            "UPDATE enrollments SET progress_percentage = ?1, is_completed = 1, completed_at = ?2
             WHERE id = ?3 AND is_completed = 0",
        )
        .bind(percentage)
        .bind(Utc::now())
        .bind(enrollment_id)
        .execute(&mut *conn)
        .await?;
        course_completed = newly.rows_affected() > 0;

        // Already-completed enrollments still get the percentage refreshed.
        if !course_completed {
            sqlx::query("UPDATE enrollments SET progress_percentage = ?1 WHERE id = ?2")
                .bind(percentage)
                .bind(enrollment_id)
                .execute(&mut *conn)
                .await?;
        }
    } else {
        sqlx::query("UPDATE enrollments SET progress_percentage = ?1 WHERE id = ?2")
            .bind(percentage)
            .bind(enrollment_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(ProgressUpdate {
        percentage,
        course_completed,
    })
}
