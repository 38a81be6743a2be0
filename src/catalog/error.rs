use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Service error taxonomy, mapped onto the `{"message": ...}` payloads the
/// frontend expects.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User already exists")]
    UserExists,

    #[error("No token provided")]
    MissingToken,

    #[error("Not authorized, invalid token")]
    InvalidToken,

    #[error("Not authorized, user not found")]
    UserGone,

    #[error("Admin access only")]
    AdminOnly,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Malformed payload")]
    MalformedPayload,

    #[error("Store error: {0}")]
    Store(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidCredentials
            | ApiError::MissingToken
            | ApiError::InvalidToken
            | ApiError::UserGone => StatusCode::UNAUTHORIZED,
            ApiError::AdminOnly => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UserExists | ApiError::MalformedPayload => StatusCode::BAD_REQUEST,
            ApiError::Store(_) | ApiError::Serde(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {self}");
        }
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}
