use crate::dtos::common::MessageResponse;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use database::error::ServiceError;
use log::error;
use sea_orm::DbErr;

/// Everything a handler can fail with
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("Please login first")]
    Unauthenticated,
    #[error("Session store failure: {0}")]
    Session(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Service(ServiceError::validation(message))
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Service(ServiceError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Service(ServiceError::Auth) | Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Service(ServiceError::AccountDisabled | ServiceError::Forbidden(_)) => {
                StatusCode::FORBIDDEN
            }
            Self::Service(ServiceError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Service(ServiceError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Service(ServiceError::Database(_) | ServiceError::PasswordHash(_))
            | Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        Self::Service(ServiceError::Database(err))
    }
}

impl From<tower_sessions::session::Error> for ApiError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Session(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {self}");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(MessageResponse::failure(message))).into_response()
    }
}
