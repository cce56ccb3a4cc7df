use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::board::MoveError;
use crate::momence::MomenceError;

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    NotImplemented(String),
    Upstream(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg).into_response(),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg).into_response(),
            ApiError::NotImplemented(msg) => (StatusCode::NOT_IMPLEMENTED, msg).into_response(),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg).into_response(),
        }
    }
}

impl From<MomenceError> for ApiError {
    fn from(value: MomenceError) -> Self {
        if value.is_not_found() {
            return ApiError::NotFound("Resource not found in booking service".into());
        }
        error!("Momence error: {value}");
        match value {
            MomenceError::Auth(_) => {
                ApiError::Upstream("Failed to authenticate with booking service".into())
            }
            MomenceError::Decode(_) | MomenceError::UnexpectedContent(_) => {
                ApiError::Upstream("Booking service returned malformed data".into())
            }
            MomenceError::Http(_) | MomenceError::Url(_) | MomenceError::Api { .. } => {
                ApiError::Upstream("Failed to reach booking service".into())
            }
        }
    }
}

impl From<MoveError> for ApiError {
    fn from(value: MoveError) -> Self {
        match value {
            MoveError::NotWired => ApiError::NotImplemented(value.to_string()),
            MoveError::Rejected(_) => ApiError::Conflict(value.to_string()),
        }
    }
}
