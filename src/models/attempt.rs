// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'quiz_attempts' table: one learner's run through a quiz,
/// tracked start-to-finish.
///
/// Lifecycle: created with status 'in_progress'; per-question grades land in
/// 'student_answers'; finalized to 'completed' or 'time_expired' with the
/// aggregated score. (user_id, quiz_id, attempt_number) is unique.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    pub enrollment_id: i64,

    /// 1-based, monotonically assigned per (user, quiz).
    pub attempt_number: i64,

    /// 'in_progress', 'completed' or 'time_expired'.
    pub status: String,

    /// Percentage, 2 decimal places.
    pub score: f64,

    /// Snapshot of the quiz's point total at start time; never recomputed.
    pub total_points: i64,

    pub earned_points: i64,
    pub is_passed: bool,

    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,

    /// Client-reported elapsed time; analytics-grade, not enforced.
    pub time_spent_seconds: i64,
}

/// DTO for submitting one answer. All fields optional in the body; the
/// irrelevant ones for the question type are ignored.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    /// Selected answer ids (multiple_choice / true_false).
    #[serde(default)]
    pub answer_ids: Vec<i64>,

    /// Free-text answer (text questions).
    #[serde(default)]
    #[validate(length(max = 10000, message = "Réponse trop longue"))]
    pub text_answer: String,

    /// Client-measured seconds spent on this question; overwrites on
    /// resubmission.
    #[serde(default)]
    #[validate(range(min = 0))]
    pub time_spent: i64,
}

/// DTO for finishing an attempt.
#[derive(Debug, Deserialize, Validate)]
pub struct FinishAttemptRequest {
    /// 'completed' or 'time_expired'.
    #[serde(default = "default_finish_reason")]
    #[validate(custom(function = validate_finish_reason))]
    pub reason: String,

    /// Client-measured total seconds spent on the attempt.
    #[serde(default)]
    #[validate(range(min = 0))]
    pub total_time_spent: i64,
}

fn default_finish_reason() -> String {
    "completed".to_string()
}

/// Restricts the finish reason to the two terminal statuses.
fn validate_finish_reason(reason: &str) -> Result<(), validator::ValidationError> {
    if reason != "completed" && reason != "time_expired" {
        return Err(validator::ValidationError::new("invalid_finish_reason"));
    }
    Ok(())
}

/// Immediate feedback for one submitted answer. Correct answers are included
/// for choice-type questions even mid-attempt (deliberate feedback UX).
#[derive(Debug, Serialize)]
pub struct SubmitAnswerResponse {
    pub is_correct: bool,
    pub points_earned: i64,
    pub points_possible: i64,
    pub explanation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answers: Option<Vec<CorrectAnswer>>,
}

#[derive(Debug, Serialize)]
pub struct CorrectAnswer {
    pub id: i64,
    pub text: String,
}

/// Final result of a closed attempt.
#[derive(Debug, Serialize)]
pub struct FinishAttemptResponse {
    pub score: f64,
    pub is_passed: bool,
    pub passing_score: i64,
    pub earned_points: i64,
    pub total_points: i64,
    pub attempt_number: i64,
    pub can_retake: bool,
}
