use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Query parameters for the learner's course list.
#[derive(Debug, Deserialize)]
pub struct MyCoursesParams {
    /// 'completed' or 'in_progress'; anything else returns everything.
    pub status: Option<String>,
}

/// Enrollment row joined with course info for the learner's course list.
#[derive(Debug, Serialize, FromRow)]
pub struct MyCourseRow {
    pub enrollment_id: i64,
    pub course_id: i64,
    pub title: String,
    pub slug: String,
    pub short_description: String,
    pub difficulty: String,
    pub progress_percentage: i64,
    pub is_completed: bool,
    pub enrolled_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}
