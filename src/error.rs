// src/error.rs

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
///
/// User-facing messages are French (the platform's language); logs stay
/// English.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., duplicate enrollment)
    Conflict(String),

    // 403: the user holds no enrollment for the quiz's course
    NotEnrolled,

    // 404: the lesson has no quiz
    NoQuiz,

    // 400: attempt count hit the quiz's max_attempts (carries the limit)
    AttemptLimitReached(u32),

    // 409: the attempt is no longer in_progress
    AttemptClosed,

    // 404: the question does not belong to the attempt's quiz
    QuestionMismatch,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Erreur interne du serveur".to_string())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::NotEnrolled => (
                StatusCode::FORBIDDEN,
                "Non inscrit au cours".to_string(),
            ),
            AppError::NoQuiz => (
                StatusCode::NOT_FOUND,
                "Pas de quiz pour cette leçon".to_string(),
            ),
            AppError::AttemptLimitReached(limit) => (
                StatusCode::BAD_REQUEST,
                format!("Nombre maximum de tentatives atteint ({})", limit),
            ),
            AppError::AttemptClosed => (
                StatusCode::CONFLICT,
                "Cette tentative est déjà terminée".to_string(),
            ),
            AppError::QuestionMismatch => (
                StatusCode::NOT_FOUND,
                "Cette question n'appartient pas à ce quiz".to_string(),
            ),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// Whether a sqlx error is a unique-constraint violation.
/// Used to map duplicate inserts to 409 and to drive the attempt-number
/// retry loop.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// JSON extractor that reports malformed bodies as our structured error
/// instead of axum's plain-text rejection.
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(AppJson(value))
    }
}
