//! Axum route handlers for the chat endpoints.

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use super::{chat_turn, ChatReply, ChatTurn};
use crate::auth::Caller;
use crate::errors::AppError;
use crate::models::chat::{ChatCategory, ChatSessionView};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub user_id: Option<String>,
    pub user_input: Option<String>,
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatLoadRequest {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatDeleteRequest {
    pub user_id: Option<String>,
    pub session_id: Option<Uuid>,
}

async fn run_chat(
    state: AppState,
    caller: Caller,
    request: ChatRequest,
    category: ChatCategory,
) -> Result<Json<ChatReply>, AppError> {
    let input = request
        .user_input
        .filter(|input| !input.trim().is_empty())
        .ok_or_else(|| AppError::Validation("userInput required".to_string()))?;
    let user_id = caller.resolve(request.user_id.as_deref())?;

    let reply = chat_turn(
        state.chats.as_ref(),
        state.llm.as_ref(),
        ChatTurn {
            user_id,
            session_id: request.session_id,
            input,
            category,
        },
    )
    .await?;

    Ok(Json(reply))
}

/// POST /api/chat-bot
pub async fn handle_career_chat(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, AppError> {
    run_chat(state, caller, request, ChatCategory::Career).await
}

/// POST /api/kanka-chat
pub async fn handle_buddy_chat(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, AppError> {
    run_chat(state, caller, request, ChatCategory::Buddy).await
}

/// POST /api/chatload
///
/// All of the caller's sessions, newest first, each with its messages.
pub async fn handle_load_chats(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<ChatLoadRequest>,
) -> Result<Json<Vec<ChatSessionView>>, AppError> {
    let user_id = caller.resolve(request.user_id.as_deref())?;
    let sessions = state.chats.load_sessions(&user_id).await?;
    Ok(Json(sessions))
}

/// POST /api/chatdelete
pub async fn handle_delete_chat(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<ChatDeleteRequest>,
) -> Result<Json<Value>, AppError> {
    let session_id = request
        .session_id
        .ok_or_else(|| AppError::Validation("Missing sessionId".to_string()))?;
    let user_id = caller.resolve(request.user_id.as_deref())?;

    if !state.chats.delete_session(session_id, &user_id).await? {
        return Err(AppError::NotFound("Chat session not found".to_string()));
    }

    info!(session_id = %session_id, user_id = %user_id, "Chat session deleted");
    Ok(Json(json!({ "success": true })))
}
