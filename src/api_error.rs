//! The error type returned by the JSON API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::Error;

/// An error response for the JSON API, rendered as `{"error": message}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// An error with an explicit status code.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// A `400 Bad Request` error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// A `401 Unauthorized` error.
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Not authenticated")
    }

    /// A `500 Internal Server Error` with a generic message.
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        match error {
            Error::DuplicateItemId => Self::new(
                StatusCode::CONFLICT,
                "This bank connection has already been linked",
            ),
            Error::NotFound => Self::new(StatusCode::NOT_FOUND, "Not found"),
            Error::CookieMissing | Error::InvalidToken => Self::unauthorized(),
            error => {
                tracing::error!("An unexpected error occurred: {error}");
                Self::internal()
            }
        }
    }
}
