use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use database::{db::create_connection, services::identity::IdentityService};
use migration::{Migrator, MigratorTrait};
use models::auth::RoleName;
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use server::{app, config::Config, session_layer, state::AppState};
use tower::ServiceExt;

async fn test_app() -> (Router, DatabaseConnection) {
    let db = create_connection("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();

    let router = app(AppState { db: db.clone() }, session_layer(&Config::default()));
    (router, db)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Option<String>, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, set_cookie, json)
}

async fn register(app: &Router, username: &str) -> i64 {
    let (status, _, body) = send(
        app,
        "POST",
        "/register",
        None,
        Some(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "password123",
            "confirm_password": "password123",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["user_id"].as_i64().unwrap()
}

async fn login(app: &Router, username: &str) -> String {
    let (status, cookie, body) = send(
        app,
        "POST",
        "/login",
        None,
        Some(json!({
            "email": format!("{username}@example.com"),
            "password": "password123",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    cookie.expect("login sets a session cookie")
}

/// Registers an instructor and publishes a course through the admin routes
async fn published_course(app: &Router, db: &DatabaseConnection, price: f64) -> (i64, String) {
    let instructor_id = register(app, "instructor").await;
    IdentityService::grant_role(db, instructor_id, RoleName::Instructor)
        .await
        .unwrap();
    let cookie = login(app, "instructor").await;

    let (status, _, course) = send(
        app,
        "POST",
        "/admin/course/create",
        Some(&cookie),
        Some(json!({ "title": "Rust for Beginners", "price": price })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{course}");
    assert_eq!(course["status"], "draft");
    let course_id = course["id"].as_i64().unwrap();

    let (status, _, body) = send(
        app,
        "POST",
        &format!("/admin/course/{course_id}/edit"),
        Some(&cookie),
        Some(json!({ "title": "Rust for Beginners", "price": price, "status": "published" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    (course_id, cookie)
}

#[tokio::test]
async fn register_login_and_view_profile() {
    let (app, _db) = test_app().await;
    let user_id = register(&app, "alice").await;
    let cookie = login(&app, "alice").await;

    let (status, _, body) = send(&app, "GET", "/profile", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["user"]["id"].as_i64(), Some(user_id));
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["enrollments"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn rejects_wrong_password() {
    let (app, _db) = test_app().await;
    register(&app, "bob").await;

    let (status, _, body) = send(
        &app,
        "POST",
        "/login",
        None,
        Some(json!({ "email": "bob@example.com", "password": "nope-nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let (app, _db) = test_app().await;
    register(&app, "carol").await;

    let (status, _, _) = send(
        &app,
        "POST",
        "/register",
        None,
        Some(json!({
            "username": "carol",
            "email": "other@example.com",
            "password": "password123",
            "confirm_password": "password123",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn protected_routes_require_a_session() {
    let (app, _db) = test_app().await;

    for (method, uri) in [
        ("GET", "/profile"),
        ("POST", "/favorite/1"),
        ("POST", "/enroll/1"),
        ("GET", "/learn/1"),
        ("GET", "/admin/courses"),
    ] {
        let (status, _, body) = send(&app, method, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(body["message"], "Please login first");
    }
}

#[tokio::test]
async fn logout_ends_the_session() {
    let (app, _db) = test_app().await;
    register(&app, "dave").await;
    let cookie = login(&app, "dave").await;

    let (status, _, _) = send(&app, "POST", "/logout", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(&app, "GET", "/profile", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn students_cannot_author_courses() {
    let (app, _db) = test_app().await;
    register(&app, "erin").await;
    let cookie = login(&app, "erin").await;

    let (status, _, _) = send(
        &app,
        "POST",
        "/admin/course/create",
        Some(&cookie),
        Some(json!({ "title": "Sneaky" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn favorite_toggles_back_and_forth() {
    let (app, db) = test_app().await;
    let (course_id, _) = published_course(&app, &db, 99.0).await;
    register(&app, "frank").await;
    let cookie = login(&app, "frank").await;

    let uri = format!("/favorite/{course_id}");
    let (_, _, first) = send(&app, "POST", &uri, Some(&cookie), None).await;
    assert_eq!(first["is_favorited"], true);

    let (_, _, second) = send(&app, "POST", &uri, Some(&cookie), None).await;
    assert_eq!(second["is_favorited"], false);

    let (status, _, _) = send(&app, "POST", "/favorite/9999", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn enroll_once_then_conflict() {
    let (app, db) = test_app().await;
    let (course_id, _) = published_course(&app, &db, 0.0).await;
    register(&app, "grace").await;
    let cookie = login(&app, "grace").await;

    let uri = format!("/enroll/{course_id}");
    let (status, _, body) = send(&app, "POST", &uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["payment_method"], "free");
    assert!(body["order_no"].as_str().unwrap().starts_with("ORD"));

    let (status, _, body) = send(&app, "POST", &uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (_, _, detail) = send(&app, "GET", &format!("/course/{course_id}"), Some(&cookie), None).await;
    assert_eq!(detail["is_enrolled"], true);
    assert_eq!(detail["course"]["enrollment_count"], 1);
}

#[tokio::test]
async fn listing_shows_only_published_courses() {
    let (app, db) = test_app().await;
    let (course_id, cookie) = published_course(&app, &db, 49.0).await;

    let (status, _, _) = send(
        &app,
        "POST",
        "/admin/course/create",
        Some(&cookie),
        Some(json!({ "title": "Unfinished draft" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, body) = send(&app, "GET", "/courses?sort=price_low", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|c| c["id"].as_i64())
        .collect();
    assert_eq!(ids, vec![course_id]);
    assert_eq!(body[0]["instructor_name"], "instructor");

    let (status, _, _) = send(&app, "GET", "/courses?level=expert", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _db) = test_app().await;

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
