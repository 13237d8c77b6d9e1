use crate::{
    auth::CurrentUser,
    dtos::{
        admin::{ChapterForm, CourseEditResponse, CourseForm, LessonForm},
        common::MessageResponse,
        course::{ChapterResponse, CourseResponse, LessonResponse},
    },
    error::ApiError,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use database::services::{query_course::QueryCourseService, save_course::SaveCourseService};

/// Courses the caller may manage; admins see all
#[utoipa::path(
    get,
    path = "/admin/courses",
    responses(
        (status = 200, description = "Managed courses, newest first", body = Vec<CourseResponse>),
        (status = 401, description = "Not signed in", body = MessageResponse),
        (status = 403, description = "Not an instructor or admin", body = MessageResponse)
    ),
    security(("session" = [])),
    tag = "Admin"
)]
pub async fn list_courses(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<CourseResponse>>, ApiError> {
    let courses = QueryCourseService::admin_list_courses(&state.db, &user).await?;
    Ok(Json(courses.into_iter().map(Into::into).collect()))
}

/// Create a draft course owned by the caller
#[utoipa::path(
    post,
    path = "/admin/course/create",
    request_body = CourseForm,
    responses(
        (status = 201, description = "Course created", body = CourseResponse),
        (status = 400, description = "Missing title or invalid price", body = MessageResponse),
        (status = 403, description = "Not an instructor or admin", body = MessageResponse)
    ),
    security(("session" = [])),
    tag = "Admin"
)]
pub async fn create_course(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(form): Json<CourseForm>,
) -> Result<(StatusCode, Json<CourseResponse>), ApiError> {
    let course = SaveCourseService::create_course(&state.db, &user, form.into_input()?).await?;
    Ok((StatusCode::CREATED, Json(course.into())))
}

/// Current values of a course for editing, with the category choices
#[utoipa::path(
    get,
    path = "/admin/course/{id}/edit",
    params(
        ("id" = i64, Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Course and categories", body = CourseEditResponse),
        (status = 403, description = "Not the owner or an admin", body = MessageResponse),
        (status = 404, description = "Course not found", body = MessageResponse)
    ),
    security(("session" = [])),
    tag = "Admin"
)]
pub async fn edit_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<CourseEditResponse>, ApiError> {
    let course = SaveCourseService::managed_course(&state.db, id, &user).await?;
    let categories = QueryCourseService::list_categories(&state.db).await?;

    Ok(Json(CourseEditResponse {
        course: course.into(),
        categories: categories.into_iter().map(Into::into).collect(),
    }))
}

/// Update a course; the first publish stamps `published_at`
#[utoipa::path(
    post,
    path = "/admin/course/{id}/edit",
    params(
        ("id" = i64, Path, description = "Course ID")
    ),
    request_body = CourseForm,
    responses(
        (status = 200, description = "Course updated", body = CourseResponse),
        (status = 400, description = "Invalid field", body = MessageResponse),
        (status = 403, description = "Not the owner or an admin", body = MessageResponse),
        (status = 404, description = "Course not found", body = MessageResponse)
    ),
    security(("session" = [])),
    tag = "Admin"
)]
pub async fn update_course(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(form): Json<CourseForm>,
) -> Result<Json<CourseResponse>, ApiError> {
    let course = SaveCourseService::update_course(&state.db, id, &user, form.into_input()?).await?;
    Ok(Json(course.into()))
}

/// Delete a course nobody is enrolled in
#[utoipa::path(
    post,
    path = "/admin/course/{id}/delete",
    params(
        ("id" = i64, Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Course deleted", body = MessageResponse),
        (status = 403, description = "Not the owner or an admin", body = MessageResponse),
        (status = 404, description = "Course not found", body = MessageResponse),
        (status = 409, description = "Course has enrollments", body = MessageResponse)
    ),
    security(("session" = [])),
    tag = "Admin"
)]
pub async fn delete_course(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    SaveCourseService::delete_course(&state.db, id, &user).await?;
    Ok(Json(MessageResponse::ok("Course deleted")))
}

/// Add a chapter to a course
#[utoipa::path(
    post,
    path = "/admin/course/{id}/chapters",
    params(
        ("id" = i64, Path, description = "Course ID")
    ),
    request_body = ChapterForm,
    responses(
        (status = 201, description = "Chapter created", body = ChapterResponse),
        (status = 403, description = "Not the owner or an admin", body = MessageResponse),
        (status = 404, description = "Course not found", body = MessageResponse)
    ),
    security(("session" = [])),
    tag = "Admin"
)]
pub async fn add_chapter(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(form): Json<ChapterForm>,
) -> Result<(StatusCode, Json<ChapterResponse>), ApiError> {
    let chapter = SaveCourseService::add_chapter(&state.db, id, &user, form.into()).await?;
    Ok((StatusCode::CREATED, Json(ChapterResponse::new(chapter, vec![]))))
}

/// Add a lesson to a chapter
#[utoipa::path(
    post,
    path = "/admin/chapter/{id}/lessons",
    params(
        ("id" = i64, Path, description = "Chapter ID")
    ),
    request_body = LessonForm,
    responses(
        (status = 201, description = "Lesson created", body = LessonResponse),
        (status = 400, description = "Invalid field", body = MessageResponse),
        (status = 403, description = "Not the owner or an admin", body = MessageResponse),
        (status = 404, description = "Chapter not found", body = MessageResponse)
    ),
    security(("session" = [])),
    tag = "Admin"
)]
pub async fn add_lesson(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(form): Json<LessonForm>,
) -> Result<(StatusCode, Json<LessonResponse>), ApiError> {
    let lesson = SaveCourseService::add_lesson(&state.db, id, &user, form.into_input()?).await?;
    Ok((StatusCode::CREATED, Json(lesson.into())))
}
