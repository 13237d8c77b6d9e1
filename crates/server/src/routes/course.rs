use crate::{
    auth::{CurrentUser, MaybeUser},
    dtos::{
        common::{MessageResponse, parse_optional},
        course::{
            CategoryResponse, CourseDetailResponse, CourseQueryParams, CourseResponse,
            EnrollResponse, FavoriteResponse, ReviewRequest, ReviewResponse,
        },
    },
    error::ApiError,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use database::services::{
    commerce::CommerceService, engagement::EngagementService, query_course::QueryCourseService,
};
use models::course_query::{CourseFilter, CourseSort};

/// List published courses
#[utoipa::path(
    get,
    path = "/courses",
    params(CourseQueryParams),
    responses(
        (status = 200, description = "Published courses matching the filters", body = Vec<CourseResponse>),
        (status = 400, description = "Invalid level", body = MessageResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "Catalog"
)]
pub async fn get_courses(
    State(state): State<AppState>,
    Query(params): Query<CourseQueryParams>,
) -> Result<Json<Vec<CourseResponse>>, ApiError> {
    let filter = CourseFilter {
        category_id: params.category,
        level: parse_optional(params.level, "level")?,
        keyword: params.keyword,
        sort: CourseSort::from_param(params.sort.as_deref()),
    };

    let courses = QueryCourseService::list_published_courses(&state.db, &filter).await?;
    Ok(Json(courses.into_iter().map(Into::into).collect()))
}

/// List all categories, top-level first
#[utoipa::path(
    get,
    path = "/categories",
    responses(
        (status = 200, description = "Categories", body = Vec<CategoryResponse>)
    ),
    tag = "Catalog"
)]
pub async fn get_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    let categories = QueryCourseService::list_categories(&state.db).await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

/// Get a course with its outline and latest reviews
#[utoipa::path(
    get,
    path = "/course/{id}",
    params(
        ("id" = i64, Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Course found", body = CourseDetailResponse),
        (status = 404, description = "Course not found", body = MessageResponse)
    ),
    tag = "Catalog"
)]
pub async fn get_course_by_id(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<CourseDetailResponse>, ApiError> {
    let viewer_id = viewer.map(|ctx| ctx.user_id);
    let detail = QueryCourseService::get_course_detail(&state.db, id, viewer_id).await?;
    Ok(Json(detail.into()))
}

/// Add or remove a course from the user's favorites
#[utoipa::path(
    post,
    path = "/favorite/{course_id}",
    params(
        ("course_id" = i64, Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "New favorite state", body = FavoriteResponse),
        (status = 401, description = "Not signed in", body = MessageResponse),
        (status = 404, description = "Course not found", body = MessageResponse)
    ),
    security(("session" = [])),
    tag = "Engagement"
)]
pub async fn toggle_favorite(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(course_id): Path<i64>,
) -> Result<Json<FavoriteResponse>, ApiError> {
    let is_favorited = EngagementService::toggle_favorite(&state.db, user.user_id, course_id).await?;

    let message = if is_favorited {
        "Added to favorites"
    } else {
        "Removed from favorites"
    };

    Ok(Json(FavoriteResponse {
        success: true,
        message: message.to_string(),
        is_favorited,
    }))
}

/// Buy a course and enroll in it
#[utoipa::path(
    post,
    path = "/enroll/{course_id}",
    params(
        ("course_id" = i64, Path, description = "Course ID")
    ),
    responses(
        (status = 201, description = "Enrolled", body = EnrollResponse),
        (status = 401, description = "Not signed in", body = MessageResponse),
        (status = 404, description = "Course not found", body = MessageResponse),
        (status = 409, description = "Already enrolled", body = MessageResponse)
    ),
    security(("session" = [])),
    tag = "Engagement"
)]
pub async fn enroll(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(course_id): Path<i64>,
) -> Result<(StatusCode, Json<EnrollResponse>), ApiError> {
    let receipt = CommerceService::enroll(&state.db, user.user_id, course_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(EnrollResponse {
            success: true,
            message: "Enrollment successful! Start learning!".to_string(),
            course_id,
            enrollment_id: receipt.enrollment.id,
            order_no: receipt.order.order_no,
            payment_method: receipt.order.payment_method.to_string(),
            final_amount: receipt.order.final_amount,
        }),
    ))
}

/// Review an enrolled course
#[utoipa::path(
    post,
    path = "/course/{id}/review",
    params(
        ("id" = i64, Path, description = "Course ID")
    ),
    request_body = ReviewRequest,
    responses(
        (status = 201, description = "Review published", body = ReviewResponse),
        (status = 400, description = "Rating out of range", body = MessageResponse),
        (status = 403, description = "Not enrolled", body = MessageResponse),
        (status = 409, description = "Already reviewed", body = MessageResponse)
    ),
    security(("session" = [])),
    tag = "Engagement"
)]
pub async fn submit_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<ReviewRequest>,
) -> Result<(StatusCode, Json<ReviewResponse>), ApiError> {
    let review =
        EngagementService::submit_review(&state.db, user.user_id, id, req.rating, req.content)
            .await?;

    Ok((
        StatusCode::CREATED,
        Json(ReviewResponse {
            id: review.id,
            user_id: review.user_id,
            username: Some(user.username),
            rating: review.rating,
            content: review.content,
            helpful_count: review.helpful_count,
            created_at: review.created_at,
        }),
    ))
}
