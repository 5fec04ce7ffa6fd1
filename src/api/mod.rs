//! REST API module.
//!
//! Handlers decode requests into typed commands, call the catalog and wrap
//! the outcome in the shared `{ success, data?, message? }` envelope.

mod chatbot;
mod schemes;

pub use chatbot::*;
pub use schemes::*;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Query, Request, State,
    },
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::errors::{AppError, ErrorReply};
use crate::AppState;

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            status: StatusCode::OK,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl ApiResponse<()> {
    /// Envelope carrying only a message.
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            status: StatusCode::OK,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, ErrorReply>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}

/// Create an error API response, with internal detail in development.
pub fn error<T: Serialize>(err: AppError, state: &AppState) -> ApiResult<T> {
    Err(reply(err, state))
}

fn reply(err: AppError, state: &AppState) -> ErrorReply {
    ErrorReply {
        error: err,
        verbose: state.config.is_development(),
    }
}

/// JSON body extractor whose rejection is a validation envelope.
pub struct Payload<T>(pub T);

impl<T> FromRequest<AppState> for Payload<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = ErrorReply;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Payload(value)),
            Err(rejection) => Err(reply(body_error(&rejection), state)),
        }
    }
}

fn body_error(rejection: &JsonRejection) -> AppError {
    AppError::validation("body", rejection.body_text())
}

/// Query string extractor whose rejection is a validation envelope.
pub struct Params<T>(pub T);

impl<T> FromRequestParts<AppState> for Params<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = ErrorReply;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Params(value)),
            Err(rejection) => Err(reply(query_error(&rejection), state)),
        }
    }
}

fn query_error(rejection: &QueryRejection) -> AppError {
    AppError::validation("query", rejection.body_text())
}

/// Fallback for paths no route matches.
pub async fn not_found(State(state): State<AppState>) -> ErrorReply {
    reply(AppError::NotFound("Route not found".to_string()), &state)
}
