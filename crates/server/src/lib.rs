pub mod auth;
pub mod config;
pub mod doc;
pub mod dtos;
pub mod error;
pub mod routes;
pub mod state;
pub mod utils;

use crate::{
    config::Config,
    doc::{ApiDoc, SESSION_COOKIE},
    routes::{admin, auth as auth_routes, course, health, learn, profile, root},
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::time::Duration};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Cookie-based sessions kept in process memory
pub fn session_layer(config: &Config) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE)
        .with_secure(config.secure_cookies)
        .with_expiry(Expiry::OnInactivity(Duration::minutes(
            config.session_ttl_minutes,
        )))
}

/// Builds the full application router
pub fn app(state: AppState, sessions: SessionManagerLayer<MemoryStore>) -> Router {
    Router::new()
        .route("/", get(root::home))
        .route("/health", get(health::health))
        .route("/register", post(auth_routes::register))
        .route("/login", post(auth_routes::login))
        .route("/logout", get(auth_routes::logout).post(auth_routes::logout))
        .route("/courses", get(course::get_courses))
        .route("/categories", get(course::get_categories))
        .route("/course/{id}", get(course::get_course_by_id))
        .route("/course/{id}/review", post(course::submit_review))
        .route("/favorite/{course_id}", post(course::toggle_favorite))
        .route("/enroll/{course_id}", post(course::enroll))
        .route("/profile", get(profile::get_profile))
        .route("/profile/edit", post(profile::edit_profile))
        .route("/learn/{course_id}", get(learn::learn))
        .route(
            "/learn/lesson/{lesson_id}/progress",
            post(learn::record_progress),
        )
        .route("/admin/courses", get(admin::list_courses))
        .route("/admin/course/create", post(admin::create_course))
        .route(
            "/admin/course/{id}/edit",
            get(admin::edit_form).post(admin::update_course),
        )
        .route("/admin/course/{id}/delete", post(admin::delete_course))
        .route("/admin/course/{id}/chapters", post(admin::add_chapter))
        .route("/admin/chapter/{id}/lessons", post(admin::add_lesson))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(CompressionLayer::new())
                .layer(sessions),
        )
        .with_state(state)
}
