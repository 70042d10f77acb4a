// src/routes.rs

use axum::{
    Router,
    http::Method,
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{courses, enrollment, notifications, quiz},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (courses, quiz, profile, notifications).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool + Config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let course_routes = Router::new()
        .route("/", get(courses::list_courses))
        .route("/{slug}", get(courses::get_course))
        // Protected course routes (enrollment, lesson progress, quiz gates)
        .merge(
            Router::new()
                .route("/{slug}/enroll", post(enrollment::enroll_course))
                .route(
                    "/{course_slug}/lessons/{lesson_slug}/complete",
                    post(enrollment::complete_lesson),
                )
                .route(
                    "/{course_slug}/lessons/{lesson_slug}/quiz",
                    get(quiz::get_quiz_status),
                )
                .route(
                    "/{course_slug}/lessons/{lesson_slug}/quiz/start",
                    post(quiz::start_quiz),
                )
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let quiz_routes = Router::new()
        .route(
            "/attempts/{attempt_id}/questions/{question_id}/answer",
            post(quiz::submit_answer),
        )
        .route("/attempts/{attempt_id}/finish", post(quiz::finish_attempt))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let profile_routes = Router::new()
        .route("/courses", get(enrollment::my_courses))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let notification_routes = Router::new()
        .route("/", get(notifications::list_notifications))
        .route("/{id}/read", post(notifications::mark_notification_read))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/courses", course_routes)
        .nest("/api/quiz", quiz_routes)
        .nest("/api/profile", profile_routes)
        .nest("/api/notifications", notification_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
