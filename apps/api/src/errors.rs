use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::jobs::dispatch::DispatchError;
use crate::llm_client::LlmError;
use crate::models::job::JobKind;
use crate::notify::NotifyError;
use crate::storage::StorageError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Insufficient {0} credits")]
    InsufficientCredit(JobKind),

    #[error("No credit record for user {0}")]
    NoCreditRecord(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// A synchronous third-party failure whose message is safe to show,
    /// such as unreadable PDF text.
    #[error("Upstream failure: {0}")]
    Upstream(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Machine-readable code and status for the response body.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::InsufficientCredit(_) => (StatusCode::FORBIDDEN, "INSUFFICIENT_CREDIT"),
            AppError::NoCreditRecord(_) => (StatusCode::FORBIDDEN, "NO_CREDIT_RECORD"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            AppError::Llm(_) => (StatusCode::INTERNAL_SERVER_ERROR, "LLM_ERROR"),
            AppError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            AppError::Notify(_) => (StatusCode::INTERNAL_SERVER_ERROR, "NOTIFY_ERROR"),
            AppError::Dispatch(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DISPATCH_ERROR"),
            AppError::Upstream(_) => (StatusCode::INTERNAL_SERVER_ERROR, "UPSTREAM_ERROR"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            AppError::Validation(msg) | AppError::NotFound(msg) | AppError::Unauthorized(msg) => {
                msg.clone()
            }
            AppError::InsufficientCredit(kind) => {
                format!("You have no {} credits left", kind.label())
            }
            AppError::NoCreditRecord(_) => "No credit record found for this user".to_string(),
            AppError::Forbidden => "Access denied".to_string(),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                "A database error occurred".to_string()
            }
            AppError::Llm(e) => {
                tracing::error!("LLM error: {e}");
                "An AI processing error occurred".to_string()
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {e}");
                "A storage error occurred".to_string()
            }
            AppError::Notify(e) => {
                tracing::error!("Notification error: {e}");
                "A notification error occurred".to_string()
            }
            AppError::Dispatch(e) => {
                tracing::error!("Dispatch error: {e}");
                "Failed to start processing. Please try again.".to_string()
            }
            AppError::Upstream(msg) => {
                tracing::error!("Upstream failure: {msg}");
                msg.clone()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "An internal server error occurred".to_string()
            }
        };

        let body = Json(json!({
            "success": false,
            "code": code,
            "message": message
        }));

        (status, body).into_response()
    }
}
