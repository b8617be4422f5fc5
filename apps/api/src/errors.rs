use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::repository::RepositoryError;
use crate::session::SessionError;
use crate::verification::mailer::DeliveryError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Field-level failures. `errors` carries every failing field and `input`
    /// echoes what was submitted so the form can be redrawn.
    #[error("Validation failed")]
    Validation { errors: Value, input: Value },

    #[error("Invalid verification code")]
    InvalidCode,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Mail delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Integrity violation: {0}")]
    Integrity(String),

    #[error("Session store error: {0}")]
    Session(#[from] SessionError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub const INVALID_CODE_MESSAGE: &str = "Invalid verification code. Please try again.";

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Duplicate(msg) | RepositoryError::Integrity(msg) => {
                AppError::Integrity(msg)
            }
            RepositoryError::Database(e) => AppError::Database(e),
        }
    }
}

impl AppError {
    pub fn validation(errors: impl serde::Serialize, input: impl serde::Serialize) -> Self {
        AppError::Validation {
            errors: serde_json::to_value(errors).unwrap_or(Value::Null),
            input: serde_json::to_value(input).unwrap_or(Value::Null),
        }
    }

    /// Single-field validation failure.
    pub fn field(field: &str, message: impl Into<String>, input: impl serde::Serialize) -> Self {
        AppError::validation(json!({ field: [message.into()] }), input)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation { errors, input } => {
                let body = Json(json!({
                    "error": {
                        "code": "VALIDATION_ERROR",
                        "message": "Please correct the errors below.",
                        "fields": errors,
                    },
                    "input": input,
                }));
                return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InvalidCode => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_CODE",
                INVALID_CODE_MESSAGE.to_string(),
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            AppError::Delivery(e) => {
                tracing::error!("Mail delivery error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "DELIVERY_ERROR",
                    "We could not send the verification email. Please try again later."
                        .to_string(),
                )
            }
            AppError::Integrity(msg) => {
                tracing::warn!("Integrity violation: {msg}");
                (
                    StatusCode::CONFLICT,
                    "SUBMISSION_FAILED",
                    "The submission could not be saved. Please try again.".to_string(),
                )
            }
            AppError::Session(e) => {
                tracing::error!("Session store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "SESSION_ERROR",
                    "A session error occurred".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
