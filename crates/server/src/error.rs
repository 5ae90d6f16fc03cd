//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. All route handlers should return
//! `Result<T, AppError>`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::blob::BlobError;
use crate::catalog::CatalogError;
use crate::orders::OrderError;
use crate::store::StoreError;

/// Application-level error type for the server.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request payload failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Missing or invalid admin credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Blob store operation failed.
    #[error("blob store error: {0}")]
    Blob(#[from] BlobError),

    /// Persistent store operation failed.
    #[error("store error: {0}")]
    Store(StoreError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Validation(message) => Self::Validation(message),
            CatalogError::NotFound => Self::NotFound("product not found".to_string()),
            CatalogError::Blob(e) => Self::Blob(e),
            CatalogError::Store(e) => Self::Store(e),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Validation(message) => Self::Validation(message),
            OrderError::ProductNotFound(id) => Self::NotFound(format!("product {id} not found")),
            insufficient @ OrderError::InsufficientStock { .. } => {
                Self::Validation(insufficient.to_string())
            }
            OrderError::Store(e) => Self::Store(e),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound("not found".to_string()),
            other => Self::Store(other),
        }
    }
}

/// JSON body returned for every error response.
#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Store(_) | Self::Internal(_) | Self::Blob(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Blob(_) => StatusCode::BAD_GATEWAY,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Store(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Blob(_) => "Image upload service error".to_string(),
            Self::Validation(message) => message.clone(),
            Self::NotFound(message) => message.clone(),
            Self::Unauthorized(message) => message.clone(),
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                message,
            }),
        )
            .into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
