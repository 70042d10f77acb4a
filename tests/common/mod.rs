// tests/common/mod.rs
//
// Test harness: real router on a random port over a per-test in-memory
// SQLite database, plus seed helpers for the content tables (which the
// service itself never writes).

#![allow(dead_code)]

use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use techlearn::{config::Config, routes, state::AppState, utils::jwt::sign_jwt};

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub config: Config,
}

impl TestApp {
    /// Mints a Bearer token for the given user, the way the external
    /// account system would.
    pub fn bearer(&self, user_id: i64) -> String {
        let token = sign_jwt(
            user_id,
            "student",
            &self.config.jwt_secret,
            self.config.jwt_expiration,
        )
        .expect("Failed to sign test token");
        format!("Bearer {}", token)
    }
}

/// Spawns the app on a random port with a fresh in-memory database.
/// A single pooled connection that never expires keeps the database alive
/// for the test's lifetime.
pub async fn spawn_app() -> TestApp {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
    };

    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        pool,
        config,
    }
}

pub async fn seed_user(pool: &SqlitePool) -> i64 {
    let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    sqlx::query_scalar("INSERT INTO users (username, role) VALUES (?1, 'student') RETURNING id")
        .bind(username)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Seeds a published course (with its own category and instructor).
pub async fn seed_course(pool: &SqlitePool, slug: &str, is_free: bool) -> i64 {
    let instructor_id = seed_user(pool).await;
    let category_id: i64 = sqlx::query_scalar(
        "INSERT INTO categories (name, slug) VALUES ('Programmation', ?1) RETURNING id",
    )
    .bind(format!("cat-{}", slug))
    .fetch_one(pool)
    .await
    .unwrap();

    sqlx::query_scalar(
        r#"
        INSERT INTO courses
            (category_id, instructor_id, title, slug, short_description, description,
             difficulty, is_free, price, is_published)
        VALUES (?1, ?2, ?3, ?4, 'Résumé du cours', 'Description du cours',
                'beginner', ?5, ?6, 1)
        RETURNING id
        "#,
    )
    .bind(category_id)
    .bind(instructor_id)
    .bind(format!("Cours {}", slug))
    .bind(slug)
    .bind(is_free)
    .bind(if is_free { 0.0 } else { 29.99 })
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn seed_lesson(pool: &SqlitePool, course_id: i64, slug: &str, position: i64) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO lessons (course_id, title, slug, lesson_type, position, is_published)
        VALUES (?1, ?2, ?3, 'video', ?4, 1)
        RETURNING id
        "#,
    )
    .bind(course_id)
    .bind(format!("Leçon {}", slug))
    .bind(slug)
    .bind(position)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn seed_quiz(
    pool: &SqlitePool,
    lesson_id: i64,
    passing_score: i64,
    max_attempts: i64,
) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO quizzes (lesson_id, title, passing_score, max_attempts)
        VALUES (?1, 'Quiz de validation', ?2, ?3)
        RETURNING id
        "#,
    )
    .bind(lesson_id)
    .bind(passing_score)
    .bind(max_attempts)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn seed_question(
    pool: &SqlitePool,
    quiz_id: i64,
    question_type: &str,
    points: i64,
    position: i64,
    keywords: Option<&str>,
) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO questions
            (quiz_id, question_text, question_type, points, position, explanation, text_answer_keywords)
        VALUES (?1, ?2, ?3, ?4, ?5, 'Voir la leçon.', ?6)
        RETURNING id
        "#,
    )
    .bind(quiz_id)
    .bind(format!("Question {}", position))
    .bind(question_type)
    .bind(points)
    .bind(position)
    .bind(keywords)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn seed_answer(
    pool: &SqlitePool,
    question_id: i64,
    text: &str,
    is_correct: bool,
    position: i64,
) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO answers (question_id, answer_text, is_correct, position)
        VALUES (?1, ?2, ?3, ?4)
        RETURNING id
        "#,
    )
    .bind(question_id)
    .bind(text)
    .bind(is_correct)
    .bind(position)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn seed_enrollment(pool: &SqlitePool, user_id: i64, course_id: i64) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO enrollments (user_id, course_id) VALUES (?1, ?2) RETURNING id",
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_one(pool)
    .await
    .unwrap()
}
