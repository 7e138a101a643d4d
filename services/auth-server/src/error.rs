//! AppError: the HTTP-facing error kinds from the error-handling design

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("auth missing")]
    AuthMissing,
    #[error("auth invalid")]
    AuthInvalid,
    #[error("{0}")]
    CredentialMismatch(String),
    #[error("not verified")]
    NotVerified,
    #[error("forbidden")]
    Forbidden,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("rate exceeded")]
    RateExceeded,
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<auth_store::Error> for AppError {
    fn from(err: auth_store::Error) -> Self {
        match err {
            auth_store::Error::NotFound => AppError::NotFound("Not found".to_string()),
            auth_store::Error::InvalidUsername(name) => {
                AppError::Validation(format!("invalid username: {name}"))
            }
            auth_store::Error::Conflict(name) => AppError::Conflict(name),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<access_control::Error> for AppError {
    fn from(err: access_control::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::AuthMissing | AppError::AuthInvalid => {
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            }
            AppError::CredentialMismatch(message) => (StatusCode::UNAUTHORIZED, message.clone()),
            AppError::NotVerified => (StatusCode::FORBIDDEN, "Account not verified".to_string()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            AppError::Conflict(message) => (StatusCode::CONFLICT, message.clone()),
            AppError::RateExceeded => (StatusCode::TOO_MANY_REQUESTS, "Too many requests".to_string()),
            AppError::Internal(message) => {
                error!(%message, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
