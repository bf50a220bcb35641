//! # Application Errors
//!
//! The error taxonomy shared by services and HTTP handlers.
//!
//! Authentication, authorization, not-found, conflict and validation
//! failures carry distinct statuses. Everything else collapses into a single
//! opaque internal error; the detail is logged, never returned.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::http_server::response::ErrorResponse;
use crate::search::SearchRequestError;
use crate::store::StoreError;

/// Result type for service operations
pub type AppResult<T> = Result<T, AppError>;

/// Errors surfaced by the service layer
#[derive(Debug, Error)]
pub enum AppError {
    /// No session accompanies the request
    #[error("User is not authenticated")]
    AuthenticationMissing,

    /// Unknown user or wrong password (generic, does not say which)
    #[error("Invalid login")]
    InvalidCredentials,

    /// Authenticated, but not the owner of the resource
    #[error("User is not authorized to perform this action")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// A required field is absent or malformed
    #[error("{0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl AppError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::AuthenticationMissing | AppError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) | AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to a client
    pub fn public_message(&self) -> String {
        if self.status_code().is_server_error() {
            "Internal Server Error".to_string()
        } else {
            self.to_string()
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl From<SearchRequestError> for AppError {
    fn from(err: SearchRequestError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("background task failed: {}", err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "request rejected");
        }

        (
            status,
            Json(ErrorResponse {
                error: self.public_message(),
            }),
        )
            .into_response()
    }
}
