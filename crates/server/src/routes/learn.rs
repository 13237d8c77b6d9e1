use crate::{
    auth::CurrentUser,
    dtos::{
        common::MessageResponse,
        learn::{LearnParams, LearnResponse, ProgressRequest, ProgressResponse},
    },
    error::ApiError,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use database::services::progress::ProgressService;

/// Course outline with the learner's progress
#[utoipa::path(
    get,
    path = "/learn/{course_id}",
    params(
        ("course_id" = i64, Path, description = "Course ID"),
        LearnParams
    ),
    responses(
        (status = 200, description = "Learning view", body = LearnResponse),
        (status = 401, description = "Not signed in", body = MessageResponse),
        (status = 403, description = "Not enrolled", body = MessageResponse)
    ),
    security(("session" = [])),
    tag = "Learning"
)]
pub async fn learn(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(course_id): Path<i64>,
    Query(params): Query<LearnParams>,
) -> Result<Json<LearnResponse>, ApiError> {
    let view =
        ProgressService::get_course_progress_view(&state.db, user.user_id, course_id, params.lesson)
            .await?;
    Ok(Json(view.into()))
}

/// Report how far a lesson has been watched
#[utoipa::path(
    post,
    path = "/learn/lesson/{lesson_id}/progress",
    params(
        ("lesson_id" = i64, Path, description = "Lesson ID")
    ),
    request_body = ProgressRequest,
    responses(
        (status = 200, description = "Progress recorded", body = ProgressResponse),
        (status = 400, description = "Negative duration", body = MessageResponse),
        (status = 403, description = "Not enrolled", body = MessageResponse),
        (status = 404, description = "Lesson not found", body = MessageResponse)
    ),
    security(("session" = [])),
    tag = "Learning"
)]
pub async fn record_progress(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(lesson_id): Path<i64>,
    Json(req): Json<ProgressRequest>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let update =
        ProgressService::record_progress(&state.db, user.user_id, lesson_id, req.watched_duration)
            .await?;
    Ok(Json(update.into()))
}
