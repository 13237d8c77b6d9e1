//! Session-backed identity for handlers

use crate::error::ApiError;
use axum::{extract::FromRequestParts, http::request::Parts};
use models::auth::AuthContext;
use tower_sessions::Session;

/// Session key holding the signed-in user's `AuthContext`
pub const AUTH_KEY: &str = "auth";

/// The signed-in user. Rejects with 401 when nobody is signed in.
pub struct CurrentUser(pub AuthContext);

/// The signed-in user, if any
pub struct MaybeUser(pub Option<AuthContext>);

async fn load_context<S: Send + Sync>(
    parts: &mut Parts,
    state: &S,
) -> Result<Option<AuthContext>, ApiError> {
    let session = Session::from_request_parts(parts, state)
        .await
        .map_err(|(_, message)| ApiError::Session(message.to_string()))?;

    Ok(session.get::<AuthContext>(AUTH_KEY).await?)
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        load_context(parts, state)
            .await?
            .map(CurrentUser)
            .ok_or(ApiError::Unauthenticated)
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(load_context(parts, state).await?))
    }
}
