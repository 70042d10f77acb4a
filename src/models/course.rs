use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'courses' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub category_id: i64,
    pub instructor_id: i64,
    pub title: String,
    pub slug: String,
    pub short_description: String,
    pub description: String,

    /// 'beginner', 'intermediate' or 'advanced'.
    pub difficulty: String,

    pub is_free: bool,
    pub price: f64,
    pub is_published: bool,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'lessons' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Lesson {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub slug: String,

    /// 'video', 'text', 'quiz' or 'assignment'.
    pub lesson_type: String,

    pub content: String,
    pub video_url: String,
    pub duration_minutes: i64,

    /// Display position within the course.
    /// Mapped from the database column 'position' since `order` is a reserved
    /// keyword in SQL; the JSON field stays `order` like the public API.
    #[sqlx(rename = "position")]
    pub order: i64,

    pub is_preview: bool,
    pub is_published: bool,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Query parameters for listing courses.
#[derive(Debug, Deserialize)]
pub struct CourseListParams {
    /// Category slug filter.
    pub category: Option<String>,

    /// Difficulty filter.
    pub difficulty: Option<String>,

    /// 'true' to keep only free courses.
    pub free: Option<String>,

    /// Substring search over title and descriptions.
    pub search: Option<String>,

    /// Sort order: 'newest' (default), 'oldest', 'price_low' or 'price_high'.
    pub sort: Option<String>,

    /// Number of items to return (default: 20, max: 100).
    pub limit: Option<i64>,
}

/// Catalog row with joined category name and lesson count.
#[derive(Debug, Serialize, FromRow)]
pub struct CourseSummary {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub short_description: String,
    pub difficulty: String,
    pub is_free: bool,
    pub price: f64,
    pub category_name: String,
    pub lessons_count: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}
