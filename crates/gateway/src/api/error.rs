//! Maps domain errors onto the HTTP `{success, error}` envelope fixed by
//! spec §7 ("HTTP responses carry a boolean success flag and an `error`
//! string").

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

impl From<discuss_domain::error::Error> for ApiError {
    fn from(err: discuss_domain::error::Error) -> Self {
        match err {
            discuss_domain::error::Error::Validation(msg) => Self::BadRequest(msg),
            other => {
                tracing::error!(error = %other, "internal error handling request");
                Self::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            Self::NotFound(m) => (StatusCode::NOT_FOUND, m),
            Self::Conflict(m) => (StatusCode::CONFLICT, m),
            Self::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}
