//! Server-wide error type
//!
//! Feature modules define their own error enums and map them onto HTTP
//! responses themselves. [`AppError`] covers handlers that live outside a
//! feature, such as the health check.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::response::ErrorResponse;
use crate::audit::AuditStoreError;

/// Result type alias for handlers returning [`AppError`]
pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Audit store error: {0}")]
    AuditStore(#[from] AuditStoreError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::AuditStore(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Unavailable(_) => "SERVICE_UNAVAILABLE",
            AppError::Database(_) | AppError::AuditStore(_) | AppError::Internal(_) => {
                "INTERNAL_ERROR"
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let message = match &self {
            AppError::NotFound(message)
            | AppError::Validation(message)
            | AppError::Unavailable(message) => message.clone(),
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                "A database error occurred".to_string()
            },
            AppError::AuditStore(e) => {
                tracing::error!(error = %e, "Audit store error");
                "An audit storage error occurred".to_string()
            },
            AppError::Internal(message) => {
                tracing::error!(error = %message, "Internal error");
                "An internal error occurred".to_string()
            },
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};

    async fn body_of(error: AppError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_not_found_body() {
        let (status, body) = body_of(AppError::NotFound("Audit log not found".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            json!({"success": false, "error": {"code": "NOT_FOUND", "message": "Audit log not found"}})
        );
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let (status, body) = body_of(AppError::Internal("pool exhausted".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(body["error"]["message"], "An internal error occurred");
    }
}
