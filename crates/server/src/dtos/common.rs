use crate::error::ApiError;
use serde::Serialize;
use std::str::FromStr;
use utoipa::ToSchema;

/// Body of every response that only reports an outcome
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Parses an optional enum value from a request, treating blank as absent
pub fn parse_optional<T: FromStr>(value: Option<String>, field: &str) -> Result<Option<T>, ApiError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ApiError::validation(format!("Invalid {field}: {raw}"))),
    }
}
