//! HTTP error handling and response types.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::repository::RepositoryError;
use crate::models::ModelError;
use crate::storage::StorageError;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Whether the client may retry the same request
    #[serde(default)]
    pub retryable: bool,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            retryable: false,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Resource not found
    NotFound(String),
    /// Invalid request (validation error)
    BadRequest(String),
    /// Internal server error
    Internal(String),
    /// Repository error
    Repository(RepositoryError),
    /// File storage error
    Storage(StorageError),
}

fn repository_response(err: RepositoryError) -> (StatusCode, ApiError) {
    let retryable = err.is_retryable();
    let details = err.context().to_string();
    let (status, code) = match &err {
        RepositoryError::ValidationError { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        RepositoryError::NotFound { .. } | RepositoryError::NotFoundOnUpdate { .. } => {
            (StatusCode::NOT_FOUND, "NOT_FOUND")
        }
        RepositoryError::UniqueViolation { .. } => (StatusCode::CONFLICT, "CONFLICT"),
        RepositoryError::PolicyRejected { .. } => (StatusCode::FORBIDDEN, "POLICY_REJECTED"),
        RepositoryError::ConnectionError { .. } | RepositoryError::TimeoutError { .. } => {
            (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE")
        }
        RepositoryError::QueryError { .. }
        | RepositoryError::ConfigurationError { .. }
        | RepositoryError::InternalError { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "REPOSITORY_ERROR")
        }
    };
    (
        status,
        ApiError::new(code, err.to_string())
            .with_details(details)
            .retryable(retryable),
    )
}

fn storage_response(err: StorageError) -> (StatusCode, ApiError) {
    let retryable = err.is_retryable();
    let (status, code) = match &err {
        StorageError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        StorageError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        StorageError::Unauthorized(_) | StorageError::Upstream { .. } => {
            (StatusCode::BAD_GATEWAY, "STORAGE_UPSTREAM_ERROR")
        }
        StorageError::Transport(_) => (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE"),
        StorageError::Credential(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_CREDENTIAL_ERROR"),
    };
    (status, ApiError::new(code, err.to_string()).retryable(retryable))
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", msg)),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", msg))
            }
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("INTERNAL_ERROR", msg),
            ),
            AppError::Repository(e) => repository_response(e),
            AppError::Storage(e) => storage_response(e),
        };

        if status.is_server_error() {
            tracing::error!(status = %status, code = %error.code, "{}", error.message);
        }

        (status, Json(error)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Repository(err)
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Storage(err)
    }
}

impl From<ModelError> for AppError {
    fn from(err: ModelError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        AppError::BadRequest(err.body_text())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
