//! Chatbot API endpoints.

use axum::extract::State;

use super::{error, success, ApiResult, Payload};
use crate::chatbot::{self, ChatReply, SUGGESTIONS};
use crate::models::{Category, ChatRequest};
use crate::AppState;

/// POST /api/v2/chatbot/chat
pub async fn chat(
    State(state): State<AppState>,
    Payload(request): Payload<ChatRequest>,
) -> ApiResult<ChatReply> {
    match chatbot::respond(&state.catalog, &request.prompt).await {
        Ok(reply) => success(reply),
        Err(e) => error(e, &state),
    }
}

/// GET /api/v2/chatbot/suggestions
pub async fn chat_suggestions() -> ApiResult<Vec<&'static str>> {
    success(SUGGESTIONS.to_vec())
}

/// GET /api/v2/chatbot/categories
pub async fn chat_categories() -> ApiResult<Vec<Category>> {
    success(chatbot::categories())
}
