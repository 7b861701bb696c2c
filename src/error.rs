use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API-level error taxonomy.
///
/// Input and credential problems carry a user-safe message straight to the
/// client; infrastructure failures are logged in full and collapsed to a
/// generic 500 body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(&'static str),

    /// Duplicate email on registration.
    #[error("User already exists")]
    Conflict,

    /// Unknown email or wrong password. One message for both, so the
    /// response cannot be used to probe which emails are registered.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthenticated(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(_) | ApiError::Conflict | ApiError::InvalidCredentials => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ApiError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Upstream(e) => {
                error!(error = ?e, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            }
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}
