// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'quizzes' table. A lesson has at most one quiz
/// (UNIQUE on lesson_id).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub lesson_id: i64,
    pub title: String,
    pub description: String,

    /// Minimum percentage (0-100) an attempt must reach to pass.
    pub passing_score: i64,

    pub time_limit_minutes: Option<i64>,
    pub max_attempts: i64,

    /// Advisory flag for catalog UIs; the attempt flow does not gate on it.
    pub is_active: bool,
}

/// Represents the 'questions' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,
    pub question_text: String,

    /// 'multiple_choice', 'true_false' or 'text'.
    pub question_type: String,

    pub points: i64,

    /// Mapped from the database column 'position' ('order' is reserved);
    /// unique per quiz so question ordering is deterministic.
    #[sqlx(rename = "position")]
    pub order: i64,

    /// Shown to the learner as feedback after answering.
    pub explanation: String,

    /// Comma-separated keyword list for free-text grading.
    pub text_answer_keywords: Option<String>,
}

/// Represents the 'answers' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Answer {
    pub id: i64,
    pub question_id: i64,
    pub answer_text: String,
    pub is_correct: bool,
    #[sqlx(rename = "position")]
    pub order: i64,
}

/// Quiz metadata for the status endpoint.
#[derive(Debug, Serialize)]
pub struct QuizInfo {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub passing_score: i64,
    pub max_attempts: i64,
    pub time_limit_minutes: Option<i64>,
    pub questions_count: i64,
    pub total_points: i64,
}

/// Prior attempt summary for the status endpoint.
#[derive(Debug, Serialize, FromRow)]
pub struct AttemptSummary {
    pub id: i64,
    pub attempt_number: i64,
    pub status: String,
    pub score: f64,
    pub is_passed: bool,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Question as handed to the learner when an attempt starts.
/// The answer key (is_correct flags, keywords) is withheld.
#[derive(Debug, Serialize)]
pub struct QuestionPayload {
    pub id: i64,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: String,
    pub points: i64,
    pub order: i64,
    /// Empty for free-text questions.
    pub answers: Vec<AnswerOption>,
}

/// Answer option without its correctness flag.
#[derive(Debug, Serialize)]
pub struct AnswerOption {
    pub id: i64,
    pub text: String,
    pub order: i64,
}
