use crate::{dtos::course::HomeResponse, error::ApiError, state::AppState};
use axum::{Json, extract::State};
use database::services::query_course::QueryCourseService;

/// Featured courses, latest courses and top-level categories
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Home page data", body = HomeResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "Catalog"
)]
pub async fn home(State(state): State<AppState>) -> Result<Json<HomeResponse>, ApiError> {
    let home = QueryCourseService::home(&state.db).await?;
    Ok(Json(home.into()))
}
