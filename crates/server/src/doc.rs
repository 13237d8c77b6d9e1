use crate::routes::{admin, auth, course, health, learn, profile, root};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

/// Name of the cookie carrying the session id
pub const SESSION_COOKIE: &str = "id";

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "session",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE))),
        );
    }
}

/// API Documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        root::home,
        health::health,
        auth::register,
        auth::login,
        auth::logout,
        course::get_courses,
        course::get_categories,
        course::get_course_by_id,
        course::toggle_favorite,
        course::enroll,
        course::submit_review,
        profile::get_profile,
        profile::edit_profile,
        learn::learn,
        learn::record_progress,
        admin::list_courses,
        admin::create_course,
        admin::edit_form,
        admin::update_course,
        admin::delete_course,
        admin::add_chapter,
        admin::add_lesson
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Catalog", description = "Browsing courses and categories"),
        (name = "Authentication", description = "Accounts and sessions"),
        (name = "Engagement", description = "Enrollment, favorites and reviews"),
        (name = "Profile", description = "The signed-in user's profile"),
        (name = "Learning", description = "Watching lessons and tracking progress"),
        (name = "Admin", description = "Course authoring for instructors and admins"),
        (name = "Health", description = "Liveness"),
    ),
    info(
        title = "Course Marketplace API",
        version = "1.0.0",
        description = "Online course marketplace",
        license(
            name = "MIT OR Apache-2.0",
        )
    )
)]
pub struct ApiDoc;
