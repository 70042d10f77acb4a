// src/handlers/quiz.rs
//
// The quiz attempt lifecycle: status, start, per-question submission,
// finish. Grading itself lives in crate::grading; the pass cascade in
// crate::progress.

use std::collections::{HashMap, HashSet};

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};
use validator::Validate;

use crate::{
    error::{AppError, AppJson, is_unique_violation},
    grading,
    handlers::enrollment::notify_completion,
    models::{
        attempt::{
            CorrectAnswer, FinishAttemptRequest, FinishAttemptResponse, QuizAttempt,
            SubmitAnswerRequest, SubmitAnswerResponse,
        },
        quiz::{Answer, AnswerOption, AttemptSummary, Question, QuestionPayload, Quiz, QuizInfo},
    },
    utils::jwt::Claims,
};

/// Everything the course/lesson-scoped quiz endpoints need after gating:
/// the quiz and the caller's enrollment.
struct QuizGate {
    quiz: Quiz,
    enrollment_id: i64,
}

/// Resolves course -> lesson -> enrollment -> quiz, failing with the
/// matching domain error at each missing link.
async fn resolve_quiz(
    pool: &SqlitePool,
    user_id: i64,
    course_slug: &str,
    lesson_slug: &str,
) -> Result<QuizGate, AppError> {
    let course_id = sqlx::query_scalar::<_, i64>("SELECT id FROM courses WHERE slug = ?1")
        .bind(course_slug)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Cours introuvable".to_string()))?;

    let lesson_id = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM lessons WHERE course_id = ?1 AND slug = ?2",
    )
    .bind(course_id)
    .bind(lesson_slug)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Leçon introuvable".to_string()))?;

    let enrollment_id = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM enrollments WHERE user_id = ?1 AND course_id = ?2",
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotEnrolled)?;

    let quiz = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, lesson_id, title, description, passing_score,
               time_limit_minutes, max_attempts, is_active
        FROM quizzes
        WHERE lesson_id = ?1
        "#,
    )
    .bind(lesson_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NoQuiz)?;

    Ok(QuizGate {
        quiz,
        enrollment_id,
    })
}

/// Quiz metadata, prior attempts and remaining-attempt accounting for the
/// lesson's quiz.
pub async fn get_quiz_status(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path((course_slug, lesson_slug)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.sub.parse::<i64>().unwrap_or(0);
    let gate = resolve_quiz(&pool, user_id, &course_slug, &lesson_slug).await?;
    let quiz = gate.quiz;

    let (questions_count, total_points) = sqlx::query_as::<_, (i64, i64)>(
        "SELECT COUNT(*), COALESCE(SUM(points), 0) FROM questions WHERE quiz_id = ?1",
    )
    .bind(quiz.id)
    .fetch_one(&pool)
    .await?;

    let attempts = sqlx::query_as::<_, AttemptSummary>(
        r#"
        SELECT id, attempt_number, status, score, is_passed, started_at, completed_at
        FROM quiz_attempts
        WHERE user_id = ?1 AND quiz_id = ?2
        ORDER BY started_at DESC
        "#,
    )
    .bind(user_id)
    .bind(quiz.id)
    .fetch_all(&pool)
    .await?;

    let attempts_taken = attempts.len() as i64;

    Ok(Json(serde_json::json!({
        "quiz": QuizInfo {
            id: quiz.id,
            title: quiz.title,
            description: quiz.description,
            passing_score: quiz.passing_score,
            max_attempts: quiz.max_attempts,
            time_limit_minutes: quiz.time_limit_minutes,
            questions_count,
            total_points,
        },
        "attempts": attempts,
        "can_start_new": attempts_taken < quiz.max_attempts,
        "remaining_attempts": quiz.max_attempts - attempts_taken,
    })))
}

/// Start a new attempt.
///
/// The attempt number is allocated by a single INSERT..SELECT MAX+1 under
/// the UNIQUE(user_id, quiz_id, attempt_number) constraint; a concurrent
/// start by the same user makes one inserter lose and retry, re-running the
/// ceiling check. total_points is snapshotted at creation.
pub async fn start_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path((course_slug, lesson_slug)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.sub.parse::<i64>().unwrap_or(0);
    let gate = resolve_quiz(&pool, user_id, &course_slug, &lesson_slug).await?;
    let quiz = gate.quiz;

    let total_points = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(points), 0) FROM questions WHERE quiz_id = ?1",
    )
    .bind(quiz.id)
    .fetch_one(&pool)
    .await?;

    let mut attempt_id = None;
    for _ in 0..3 {
        let mut tx = pool.begin().await?;

        let attempts_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM quiz_attempts WHERE user_id = ?1 AND quiz_id = ?2",
        )
        .bind(user_id)
        .bind(quiz.id)
        .fetch_one(&mut *tx)
        .await?;

        if attempts_count >= quiz.max_attempts {
            return Err(AppError::AttemptLimitReached(quiz.max_attempts as u32));
        }

        let inserted = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO quiz_attempts
                (user_id, quiz_id, enrollment_id, attempt_number, status, total_points, started_at)
            SELECT ?1, ?2, ?3, COALESCE(MAX(attempt_number), 0) + 1, 'in_progress', ?4, ?5
            FROM quiz_attempts
            WHERE user_id = ?1 AND quiz_id = ?2
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(quiz.id)
        .bind(gate.enrollment_id)
        .bind(total_points)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await;

        match inserted {
            Ok(id) => {
                tx.commit().await?;
                attempt_id = Some(id);
                break;
            }
            Err(e) if is_unique_violation(&e) => {
                // Lost the numbering race; retry with a fresh MAX.
                tx.rollback().await?;
            }
            Err(e) => {
                tracing::error!("Failed to create quiz attempt: {:?}", e);
                return Err(e.into());
            }
        }
    }

    let attempt_id = attempt_id.ok_or_else(|| {
        AppError::InternalServerError("Attempt number allocation kept conflicting".to_string())
    })?;

    // Hand out the question set, answer key withheld.
    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, quiz_id, question_text, question_type, points, position,
               explanation, text_answer_keywords
        FROM questions
        WHERE quiz_id = ?1
        ORDER BY position
        "#,
    )
    .bind(quiz.id)
    .fetch_all(&pool)
    .await?;

    let answers = sqlx::query_as::<_, Answer>(
        r#"
        SELECT a.id, a.question_id, a.answer_text, a.is_correct, a.position
        FROM answers a
        JOIN questions q ON a.question_id = q.id
        WHERE q.quiz_id = ?1
        ORDER BY a.question_id, a.position
        "#,
    )
    .bind(quiz.id)
    .fetch_all(&pool)
    .await?;

    let mut options_by_question: HashMap<i64, Vec<AnswerOption>> = HashMap::new();
    for answer in answers {
        options_by_question
            .entry(answer.question_id)
            .or_default()
            .push(AnswerOption {
                id: answer.id,
                text: answer.answer_text,
                order: answer.order,
            });
    }

    let question_payloads: Vec<QuestionPayload> = questions
        .into_iter()
        .map(|q| {
            let answers = if q.question_type == "text" {
                Vec::new()
            } else {
                options_by_question.remove(&q.id).unwrap_or_default()
            };
            QuestionPayload {
                id: q.id,
                text: q.question_text,
                question_type: q.question_type,
                points: q.points,
                order: q.order,
                answers,
            }
        })
        .collect();

    Ok(Json(serde_json::json!({
        "attempt_id": attempt_id,
        "questions": question_payloads,
        "time_limit_seconds": quiz.time_limit_minutes.map(|m| m * 60),
    })))
}

/// Grade and persist one answer. Resubmission replaces the previous
/// selection wholesale and is re-evaluated; grading and persistence commit
/// atomically.
pub async fn submit_answer(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path((attempt_id, question_id)): Path<(i64, i64)>,
    AppJson(payload): AppJson<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let user_id = claims.sub.parse::<i64>().unwrap_or(0);

    let attempt = fetch_own_attempt(&pool, attempt_id, user_id).await?;
    if attempt.status != "in_progress" {
        return Err(AppError::AttemptClosed);
    }

    let question = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, quiz_id, question_text, question_type, points, position,
               explanation, text_answer_keywords
        FROM questions
        WHERE id = ?1
        "#,
    )
    .bind(question_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::QuestionMismatch)?;

    if question.quiz_id != attempt.quiz_id {
        return Err(AppError::QuestionMismatch);
    }

    let question_answers = sqlx::query_as::<_, Answer>(
        r#"
        SELECT id, question_id, answer_text, is_correct, position
        FROM answers
        WHERE question_id = ?1
        ORDER BY position
        "#,
    )
    .bind(question.id)
    .fetch_all(&pool)
    .await?;

    let correct_ids: Vec<i64> = question_answers
        .iter()
        .filter(|a| a.is_correct)
        .map(|a| a.id)
        .collect();

    // Ids not belonging to the question are dropped silently; walking the
    // question's answers in position order also dedupes and fixes ordering
    // for the true/false first-selected rule.
    let submitted: HashSet<i64> = payload.answer_ids.iter().copied().collect();
    let selected_ids: Vec<i64> = if question.question_type == "text" {
        Vec::new()
    } else {
        question_answers
            .iter()
            .filter(|a| submitted.contains(&a.id))
            .map(|a| a.id)
            .collect()
    };

    let text_answer = if question.question_type == "text" {
        payload.text_answer.as_str()
    } else {
        ""
    };

    let verdict = grading::evaluate(
        &question.question_type,
        question.points,
        question.text_answer_keywords.as_deref(),
        &correct_ids,
        &selected_ids,
        text_answer,
    );

    let mut tx = pool.begin().await?;

    let student_answer_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO student_answers
            (attempt_id, question_id, text_answer, is_correct, points_earned, answered_at, time_spent_seconds)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT (attempt_id, question_id) DO UPDATE SET
            text_answer = excluded.text_answer,
            is_correct = excluded.is_correct,
            points_earned = excluded.points_earned,
            answered_at = excluded.answered_at,
            time_spent_seconds = excluded.time_spent_seconds
        RETURNING id
        "#,
    )
    .bind(attempt.id)
    .bind(question.id)
    .bind(text_answer)
    .bind(verdict.is_correct)
    .bind(verdict.points_earned)
    .bind(Utc::now())
    .bind(payload.time_spent)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to upsert student answer: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    sqlx::query("DELETE FROM student_answer_selections WHERE student_answer_id = ?1")
        .bind(student_answer_id)
        .execute(&mut *tx)
        .await?;

    if !selected_ids.is_empty() {
        let mut query_builder = sqlx::QueryBuilder::<Sqlite>::new(
            "INSERT INTO student_answer_selections (student_answer_id, answer_id) ",
        );
        query_builder.push_values(&selected_ids, |mut b, answer_id| {
            b.push_bind(student_answer_id).push_bind(answer_id);
        });
        query_builder.build().execute(&mut *tx).await?;
    }

    tx.commit().await?;

    // Immediate feedback: the correct answers are revealed for choice-type
    // questions even while the attempt is open.
    let correct_answers = if question.question_type == "text" {
        None
    } else {
        Some(
            question_answers
                .into_iter()
                .filter(|a| a.is_correct)
                .map(|a| CorrectAnswer {
                    id: a.id,
                    text: a.answer_text,
                })
                .collect(),
        )
    };

    Ok(Json(SubmitAnswerResponse {
        is_correct: verdict.is_correct,
        points_earned: verdict.points_earned,
        points_possible: question.points,
        explanation: question.explanation,
        correct_answers,
    }))
}

/// Finalize an attempt: aggregate the score, decide pass/fail, and on pass
/// cascade into lesson completion and enrollment progress, all in one
/// transaction.
pub async fn finish_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
    AppJson(payload): AppJson<FinishAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let user_id = claims.sub.parse::<i64>().unwrap_or(0);

    let attempt = fetch_own_attempt(&pool, attempt_id, user_id).await?;
    if attempt.status != "in_progress" {
        return Err(AppError::AttemptClosed);
    }

    let (passing_score, lesson_id, max_attempts) = sqlx::query_as::<_, (i64, i64, i64)>(
        "SELECT passing_score, lesson_id, max_attempts FROM quizzes WHERE id = ?1",
    )
    .bind(attempt.quiz_id)
    .fetch_one(&pool)
    .await?;

    let mut tx = pool.begin().await?;

    // Unanswered questions simply contribute nothing.
    let earned_points = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(points_earned), 0) FROM student_answers WHERE attempt_id = ?1",
    )
    .bind(attempt.id)
    .fetch_one(&mut *tx)
    .await?;

    let raw_score = if attempt.total_points > 0 {
        earned_points as f64 / attempt.total_points as f64 * 100.0
    } else {
        0.0
    };
    let score = (raw_score * 100.0).round() / 100.0;
    let is_passed = raw_score >= passing_score as f64;

    // Both reasons are terminal; time expiry does not change the formula.
    sqlx::query(
        r#"
        UPDATE quiz_attempts
        SET status = ?1, score = ?2, earned_points = ?3, is_passed = ?4,
            completed_at = ?5, time_spent_seconds = ?6
        WHERE id = ?7
        "#,
    )
    .bind(&payload.reason)
    .bind(score)
    .bind(earned_points)
    .bind(is_passed)
    .bind(Utc::now())
    .bind(payload.total_time_spent)
    .bind(attempt.id)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to finalize quiz attempt: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let mut lesson_newly_completed = false;
    let mut course_completed = false;
    if is_passed {
        lesson_newly_completed =
            crate::progress::complete_lesson(&mut *tx, attempt.enrollment_id, lesson_id).await?;
        if lesson_newly_completed {
            let update =
                crate::progress::update_enrollment_progress(&mut *tx, attempt.enrollment_id)
                    .await?;
            course_completed = update.course_completed;
        }
    }

    let attempts_taken = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM quiz_attempts WHERE user_id = ?1 AND quiz_id = ?2",
    )
    .bind(user_id)
    .bind(attempt.quiz_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    if lesson_newly_completed {
        let course_slug = sqlx::query_scalar::<_, String>(
            r#"
            SELECT c.slug
            FROM lessons l
            JOIN courses c ON l.course_id = c.id
            WHERE l.id = ?1
            "#,
        )
        .bind(lesson_id)
        .fetch_one(&pool)
        .await;
        match course_slug {
            Ok(slug) => notify_completion(&pool, user_id, &slug, course_completed).await,
            // Best-effort sink; a broken action URL is worse than no
            // notification.
            Err(e) => tracing::error!("Failed to resolve course slug for notification: {:?}", e),
        }
    }

    Ok(Json(FinishAttemptResponse {
        score,
        is_passed,
        passing_score,
        earned_points,
        total_points: attempt.total_points,
        attempt_number: attempt.attempt_number,
        can_retake: attempts_taken < max_attempts,
    }))
}

/// Fetch an attempt owned by the caller, 404 otherwise.
async fn fetch_own_attempt(
    pool: &SqlitePool,
    attempt_id: i64,
    user_id: i64,
) -> Result<QuizAttempt, AppError> {
    sqlx::query_as::<_, QuizAttempt>(
        r#"
        SELECT id, user_id, quiz_id, enrollment_id, attempt_number, status,
               score, total_points, earned_points, is_passed, started_at,
               completed_at, time_spent_seconds
        FROM quiz_attempts
        WHERE id = ?1 AND user_id = ?2
        "#,
    )
    .bind(attempt_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Tentative introuvable".to_string()))
}
