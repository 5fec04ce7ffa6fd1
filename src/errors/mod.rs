//! Error handling module for the scheme directory.
//!
//! Provides the error taxonomy with its mapping to HTTP status codes, stable
//! machine-readable codes and the shared `{ success: false, ... }` envelope.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const INVALID_ID: &str = "INVALID_ID";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const RATE_LIMITED: &str = "RATE_LIMITED";
    pub const STORE_UNAVAILABLE: &str = "STORE_UNAVAILABLE";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Bad input shape, enumeration value or missing required field
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),
    /// Identifier is not in the store's id format
    #[error("invalid scheme id: {0}")]
    MalformedId(String),
    /// Identifier does not resolve to a record
    #[error("{0}")]
    NotFound(String),
    /// Caller lacks the admin claim
    #[error("{0}")]
    Forbidden(String),
    /// Client exceeded its request window
    #[error("rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
    /// Record store or search index unreachable, timed out or misbehaving
    #[error("record store unavailable: {0}")]
    Store(String),
    /// Anything else that is our fault
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Shorthand for a validation error on one field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation(vec![FieldError::new(field, message)])
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::MalformedId(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::MalformedId(_) => codes::INVALID_ID,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::Forbidden(_) => codes::FORBIDDEN,
            AppError::RateLimited { .. } => codes::RATE_LIMITED,
            AppError::Store(_) => codes::STORE_UNAVAILABLE,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Human-readable message that is safe to show to any caller.
    pub fn message(&self) -> String {
        match self {
            AppError::Validation(_) => "Validation error".to_string(),
            AppError::MalformedId(_) => "Invalid scheme ID".to_string(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Forbidden(msg) => msg.clone(),
            AppError::RateLimited { .. } => {
                "Too many requests from this client, please try again later".to_string()
            }
            AppError::Store(_) => {
                "The scheme store is temporarily unavailable, please retry".to_string()
            }
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// Whether a caller (or the orchestrator, for reads) may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Store(_))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AppError::Store(format!("database error: {}", err))
    }
}

impl From<tantivy::TantivyError> for AppError {
    fn from(err: tantivy::TantivyError) -> Self {
        tracing::error!("Search error: {:?}", err);
        AppError::Store(format!("search index error: {}", err))
    }
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        tracing::error!("Store call timed out");
        AppError::Store("store call timed out".to_string())
    }
}

/// Error response envelope.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: &AppError, verbose: bool) -> Self {
        let errors = match error {
            AppError::Validation(fields) => Some(fields.clone()),
            _ => None,
        };

        Self {
            success: false,
            code: error.error_code().to_string(),
            message: error.message(),
            errors,
            detail: verbose.then(|| error.to_string()),
        }
    }
}

/// An error on its way out, carrying whether internal detail may be exposed.
#[derive(Debug)]
pub struct ErrorReply {
    pub error: AppError,
    pub verbose: bool,
}

impl IntoResponse for ErrorReply {
    fn into_response(self) -> Response {
        let status = self.error.status_code();
        let body = ErrorResponse::new(&self.error, self.verbose);
        let mut response = (status, Json(body)).into_response();

        if let AppError::RateLimited { retry_after_secs } = self.error {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}
