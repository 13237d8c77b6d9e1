use crate::{
    auth::CurrentUser,
    dtos::{
        common::MessageResponse,
        profile::{ProfileForm, ProfileResponse},
    },
    error::ApiError,
    state::AppState,
};
use axum::{Json, extract::State};
use database::services::{
    commerce::CommerceService,
    engagement::EngagementService,
    identity::{IdentityService, ProfileUpdate},
};

/// The signed-in user's profile, enrollments and favorites
#[utoipa::path(
    get,
    path = "/profile",
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 401, description = "Not signed in", body = MessageResponse)
    ),
    security(("session" = [])),
    tag = "Profile"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let view = IdentityService::get_profile(&state.db, user.user_id).await?;
    let enrollments = CommerceService::list_enrollments(&state.db, user.user_id).await?;
    let favorites = EngagementService::list_favorites(&state.db, user.user_id).await?;

    Ok(Json(ProfileResponse {
        user: view.into(),
        enrollments: enrollments.into_iter().map(Into::into).collect(),
        favorites: favorites.into_iter().map(Into::into).collect(),
    }))
}

/// Update bio, location, occupation and gender
#[utoipa::path(
    post,
    path = "/profile/edit",
    request_body = ProfileForm,
    responses(
        (status = 200, description = "Profile updated", body = MessageResponse),
        (status = 401, description = "Not signed in", body = MessageResponse)
    ),
    security(("session" = [])),
    tag = "Profile"
)]
pub async fn edit_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(form): Json<ProfileForm>,
) -> Result<Json<MessageResponse>, ApiError> {
    IdentityService::update_profile(
        &state.db,
        user.user_id,
        ProfileUpdate {
            bio: form.bio,
            location: form.location,
            occupation: form.occupation,
            gender: form.gender,
        },
    )
    .await?;

    Ok(Json(MessageResponse::ok("Profile updated")))
}
