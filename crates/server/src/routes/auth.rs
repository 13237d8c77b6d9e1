use crate::{
    auth::AUTH_KEY,
    dtos::{
        auth::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse},
        common::MessageResponse,
    },
    error::ApiError,
    state::AppState,
};
use axum::{Json, extract::State, http::StatusCode};
use database::services::identity::IdentityService;
use log::info;
use tower_sessions::Session;

/// Create an account with the student role
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Missing field, password mismatch or password too short", body = MessageResponse),
        (status = 409, description = "Username or email already exists", body = MessageResponse)
    ),
    tag = "Authentication"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let user_id = IdentityService::register(
        &state.db,
        &req.username,
        &req.email,
        &req.password,
        &req.confirm_password,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "Registration successful, please login".to_string(),
            user_id,
        }),
    ))
}

/// Sign in and start a session
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in, session cookie set", body = LoginResponse),
        (status = 400, description = "Missing email or password", body = MessageResponse),
        (status = 401, description = "Invalid email or password", body = MessageResponse),
        (status = 403, description = "Account has been disabled", body = MessageResponse)
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = IdentityService::authenticate(&state.db, &req.email, &req.password).await?;
    let ctx = user.context();

    // New id on privilege change
    session.cycle_id().await?;
    session.insert(AUTH_KEY, &ctx).await?;

    Ok(Json(LoginResponse {
        success: true,
        message: format!("Welcome back, {}!", ctx.username),
        user: (&ctx).into(),
    }))
}

/// End the session
#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Signed out", body = MessageResponse)
    ),
    tag = "Authentication"
)]
pub async fn logout(session: Session) -> Result<Json<MessageResponse>, ApiError> {
    if let Some(user_id) = session
        .get::<models::auth::AuthContext>(AUTH_KEY)
        .await?
        .map(|ctx| ctx.user_id)
    {
        info!("User {user_id} signed out");
    }
    session.flush().await?;

    Ok(Json(MessageResponse::ok("You have been logged out")))
}
