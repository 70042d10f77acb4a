// tests/enrollment_tests.rs
//
// Enrollment, manual lesson completion, course catalog, and the
// notification endpoints.

mod common;

use common::*;
use serde_json::Value;

async fn complete(
    app: &TestApp,
    user_id: i64,
    course_slug: &str,
    lesson_slug: &str,
) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!(
            "{}/api/courses/{}/lessons/{}/complete",
            app.address, course_slug, lesson_slug
        ))
        .header("Authorization", app.bearer(user_id))
        .send()
        .await
        .expect("complete request failed")
}

#[tokio::test]
async fn enroll_free_course_then_duplicate() {
    let app = spawn_app().await;
    let user_id = seed_user(&app.pool).await;
    seed_course(&app.pool, "html-css", true).await;

    let client = reqwest::Client::new();
    let url = format!("{}/api/courses/html-css/enroll", app.address);

    let resp = client
        .post(&url)
        .header("Authorization", app.bearer(user_id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let body: Value = resp.json().await.unwrap();
    assert!(body["id"].as_i64().unwrap() > 0);

    // Second enrollment conflicts.
    let resp = client
        .post(&url)
        .header("Authorization", app.bearer(user_id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Vous êtes déjà inscrit à ce cours");
}

#[tokio::test]
async fn paid_course_requires_payment() {
    let app = spawn_app().await;
    let user_id = seed_user(&app.pool).await;
    seed_course(&app.pool, "react-pro", false).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/courses/react-pro/enroll", app.address))
        .header("Authorization", app.bearer(user_id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["error"],
        "Veuillez procéder au paiement pour accéder à ce cours"
    );

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM enrollments")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn enroll_unknown_course_is_not_found() {
    let app = spawn_app().await;
    let user_id = seed_user(&app.pool).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/courses/inexistant/enroll", app.address))
        .header("Authorization", app.bearer(user_id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn lesson_completion_advances_progress_with_floor() {
    let app = spawn_app().await;
    let pool = &app.pool;
    let user_id = seed_user(pool).await;
    let course_id = seed_course(pool, "vue-complet", true).await;
    seed_lesson(pool, course_id, "intro", 0).await;
    seed_lesson(pool, course_id, "composants", 1).await;
    seed_lesson(pool, course_id, "routage", 2).await;
    seed_enrollment(pool, user_id, course_id).await;

    // 1 of 3 lessons: floor(100/3) = 33.
    let resp = complete(&app, user_id, "vue-complet", "intro").await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Leçon terminée!");
    assert_eq!(body["course_progress"], 33);

    // Completing the same lesson again is a no-op.
    let resp = complete(&app, user_id, "vue-complet", "intro").await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Déjà terminée");
    assert_eq!(body["course_progress"], 33);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lesson_progress")
        .fetch_one(pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);

    // One lesson_completed notification per actual completion.
    let notifs: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications WHERE notification_type = 'lesson_completed'",
    )
    .fetch_one(pool)
    .await
    .unwrap();
    assert_eq!(notifs, 1);
}

#[tokio::test]
async fn completing_all_lessons_finishes_the_course() {
    let app = spawn_app().await;
    let pool = &app.pool;
    let user_id = seed_user(pool).await;
    let course_id = seed_course(pool, "api-rest", true).await;
    seed_lesson(pool, course_id, "lecon-a", 0).await;
    seed_lesson(pool, course_id, "lecon-b", 1).await;
    seed_enrollment(pool, user_id, course_id).await;

    complete(&app, user_id, "api-rest", "lecon-a").await;
    let resp = complete(&app, user_id, "api-rest", "lecon-b").await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["course_progress"], 100);

    let (is_completed, completed_at): (bool, Option<String>) = sqlx::query_as(
        "SELECT is_completed, completed_at FROM enrollments WHERE user_id = ?1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .unwrap();
    assert!(is_completed);
    assert!(completed_at.is_some());

    let certs: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND notification_type = 'certificate'",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .unwrap();
    assert_eq!(certs, 1);
}

#[tokio::test]
async fn completing_lesson_requires_enrollment() {
    let app = spawn_app().await;
    let pool = &app.pool;
    let user_id = seed_user(pool).await;
    let course_id = seed_course(pool, "sans-inscription", true).await;
    seed_lesson(pool, course_id, "lecon-1", 0).await;

    let resp = complete(&app, user_id, "sans-inscription", "lecon-1").await;
    assert_eq!(resp.status().as_u16(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Non inscrit au cours");
}

#[tokio::test]
async fn my_courses_counters_and_status_filter() {
    let app = spawn_app().await;
    let pool = &app.pool;
    let user_id = seed_user(pool).await;

    let done_id = seed_course(pool, "cours-fini", true).await;
    seed_lesson(pool, done_id, "seule-lecon", 0).await;
    seed_enrollment(pool, user_id, done_id).await;

    let ongoing_id = seed_course(pool, "cours-en-cours", true).await;
    seed_lesson(pool, ongoing_id, "lecon-1", 0).await;
    seed_lesson(pool, ongoing_id, "lecon-2", 1).await;
    seed_enrollment(pool, user_id, ongoing_id).await;

    complete(&app, user_id, "cours-fini", "seule-lecon").await;
    complete(&app, user_id, "cours-en-cours", "lecon-1").await;

    let client = reqwest::Client::new();
    let resp = client
        .get(format!("{}/api/profile/courses", app.address))
        .header("Authorization", app.bearer(user_id))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["total_enrollments"], 2);
    assert_eq!(body["completed_count"], 1);
    assert_eq!(body["in_progress_count"], 1);
    assert_eq!(body["enrollments"].as_array().unwrap().len(), 2);

    let resp = client
        .get(format!("{}/api/profile/courses?status=completed", app.address))
        .header("Authorization", app.bearer(user_id))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let enrollments = body["enrollments"].as_array().unwrap();
    assert_eq!(enrollments.len(), 1);
    assert_eq!(enrollments[0]["slug"], "cours-fini");
    assert_eq!(enrollments[0]["progress_percentage"], 100);

    let resp = client
        .get(format!(
            "{}/api/profile/courses?status=in_progress",
            app.address
        ))
        .header("Authorization", app.bearer(user_id))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let enrollments = body["enrollments"].as_array().unwrap();
    assert_eq!(enrollments.len(), 1);
    assert_eq!(enrollments[0]["slug"], "cours-en-cours");
    assert_eq!(enrollments[0]["progress_percentage"], 50);
}

#[tokio::test]
async fn course_catalog_filters_and_detail() {
    let app = spawn_app().await;
    let pool = &app.pool;
    let free_id = seed_course(pool, "gratuit", true).await;
    seed_course(pool, "payant", false).await;
    seed_lesson(pool, free_id, "lecon-1", 0).await;
    seed_lesson(pool, free_id, "lecon-2", 1).await;

    let client = reqwest::Client::new();

    // Catalog is public.
    let resp = client
        .get(format!("{}/api/courses", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body.as_array().unwrap().len(), 2);

    let resp = client
        .get(format!("{}/api/courses?free=true", app.address))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let courses = body.as_array().unwrap();
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0]["slug"], "gratuit");
    assert_eq!(courses[0]["lessons_count"], 2);
    assert_eq!(courses[0]["category_name"], "Programmation");

    let resp = client
        .get(format!("{}/api/courses?search=payant", app.address))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body.as_array().unwrap().len(), 1);

    // Detail carries the ordered lessons.
    let resp = client
        .get(format!("{}/api/courses/gratuit", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["course"]["slug"], "gratuit");
    let lessons = body["lessons"].as_array().unwrap();
    assert_eq!(lessons.len(), 2);
    assert_eq!(lessons[0]["slug"], "lecon-1");
    assert_eq!(lessons[0]["order"], 0);

    let resp = client
        .get(format!("{}/api/courses/inconnu", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn notifications_list_filter_and_mark_read() {
    let app = spawn_app().await;
    let pool = &app.pool;
    let user_id = seed_user(pool).await;
    let other_id = seed_user(pool).await;
    let course_id = seed_course(pool, "avec-notifs", true).await;
    seed_lesson(pool, course_id, "lecon-1", 0).await;
    seed_lesson(pool, course_id, "lecon-2", 1).await;
    seed_enrollment(pool, user_id, course_id).await;

    complete(&app, user_id, "avec-notifs", "lecon-1").await;
    complete(&app, user_id, "avec-notifs", "lecon-2").await;
    // 2 lesson_completed + 1 certificate.

    let client = reqwest::Client::new();
    let resp = client
        .get(format!("{}/api/notifications", app.address))
        .header("Authorization", app.bearer(user_id))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let notifications = body["notifications"].as_array().unwrap();
    assert_eq!(notifications.len(), 3);
    assert_eq!(body["unread_count"], 3);

    let first_id = notifications[0]["id"].as_i64().unwrap();

    // Another user cannot touch it.
    let resp = client
        .post(format!("{}/api/notifications/{}/read", app.address, first_id))
        .header("Authorization", app.bearer(other_id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    // The owner can, and the call is idempotent.
    for _ in 0..2 {
        let resp = client
            .post(format!("{}/api/notifications/{}/read", app.address, first_id))
            .header("Authorization", app.bearer(user_id))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["is_read"], true);
    }

    let resp = client
        .get(format!("{}/api/notifications?unread=true", app.address))
        .header("Authorization", app.bearer(user_id))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["notifications"].as_array().unwrap().len(), 2);
    assert_eq!(body["unread_count"], 2);
}

#[tokio::test]
async fn bulk_notification_insert() {
    use techlearn::models::notification::Notification;

    let app = spawn_app().await;
    let pool = &app.pool;
    let a = seed_user(pool).await;
    let b = seed_user(pool).await;
    let c = seed_user(pool).await;

    Notification::create_bulk(
        pool,
        &[a, b, c],
        "Nouveau cours disponible",
        "Un nouveau cours vient d'être publié.",
        "announcement",
        "/courses/nouveau",
    )
    .await
    .unwrap();

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications WHERE notification_type = 'announcement'",
    )
    .fetch_one(pool)
    .await
    .unwrap();
    assert_eq!(count, 3);

    let owners: Vec<i64> =
        sqlx::query_scalar("SELECT user_id FROM notifications ORDER BY user_id")
            .fetch_all(pool)
            .await
            .unwrap();
    assert_eq!(owners, vec![a, b, c]);
}
