//! Synchronous AI chat with persisted sessions.
//!
//! Two personas share one flow: append the user's message, ask the generator,
//! format (career coach only), append the reply. No job, no polling.

pub mod handlers;
pub mod prompts;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::formatting::chat::format_career_reply;
use crate::llm_client::{GenerationRequest, TextGenerator};
use crate::models::chat::{ChatCategory, ChatSessionView, Sender};

const TITLE_CHARS: usize = 30;
const DEFAULT_TITLE: &str = "New chat";

#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Returns the id of the session to write into. An unknown `session_id`
    /// is created under that id; `None` creates a fresh session.
    async fn ensure_session(
        &self,
        session_id: Option<Uuid>,
        user_id: &str,
        category: ChatCategory,
        title: &str,
    ) -> Result<Uuid, AppError>;

    async fn append_message(
        &self,
        session_id: Uuid,
        sender: Sender,
        message: &str,
    ) -> Result<(), AppError>;

    /// Sessions newest first, each with its messages oldest first.
    async fn load_sessions(&self, user_id: &str) -> Result<Vec<ChatSessionView>, AppError>;

    /// Deletes a session the user owns, together with its messages.
    /// Returns `false` when no such session exists.
    async fn delete_session(&self, session_id: Uuid, user_id: &str) -> Result<bool, AppError>;

    async fn count_sessions(&self, user_id: &str) -> Result<i64, AppError>;
}

/// Access rule for writing into an existing session: it must belong to the
/// caller and to the persona being talked to.
pub fn check_session_access(
    owner: &str,
    stored_category: &str,
    user_id: &str,
    category: ChatCategory,
) -> Result<(), AppError> {
    if owner != user_id {
        return Err(AppError::Forbidden);
    }
    if stored_category.parse::<ChatCategory>().ok() != Some(category) {
        return Err(AppError::Validation(format!(
            "Session belongs to a different chat than {category}"
        )));
    }
    Ok(())
}

pub struct ChatTurn {
    pub user_id: String,
    pub session_id: Option<Uuid>,
    pub input: String,
    pub category: ChatCategory,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub session_id: Uuid,
    pub response: String,
}

/// First characters of the opening message, or a placeholder.
pub fn session_title(input: &str) -> String {
    let title: String = input.trim().chars().take(TITLE_CHARS).collect();
    if title.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        title
    }
}

pub async fn chat_turn(
    chats: &dyn ChatStore,
    llm: &dyn TextGenerator,
    turn: ChatTurn,
) -> Result<ChatReply, AppError> {
    if turn.input.trim().is_empty() {
        return Err(AppError::Validation("userInput required".to_string()));
    }

    let session_id = chats
        .ensure_session(
            turn.session_id,
            &turn.user_id,
            turn.category,
            &session_title(&turn.input),
        )
        .await?;

    chats
        .append_message(session_id, Sender::User, &turn.input)
        .await?;

    let request = match turn.category {
        ChatCategory::Career => GenerationRequest::new(
            vec![
                prompts::CAREER_COACH_SYSTEM.to_string(),
                format!("User: {}", turn.input),
            ],
            0.7,
            500,
        ),
        ChatCategory::Buddy => GenerationRequest::new(
            vec![
                prompts::BUDDY_SYSTEM.to_string(),
                format!("User: {}", turn.input),
            ],
            0.9,
            400,
        ),
    };

    let raw = llm.generate(request).await?;
    let response = match turn.category {
        ChatCategory::Career => format_career_reply(&raw),
        ChatCategory::Buddy => raw.trim().to_string(),
    };

    chats
        .append_message(session_id, Sender::Ai, &response)
        .await?;

    info!(
        session_id = %session_id,
        category = %turn.category,
        "Chat turn completed"
    );

    Ok(ChatReply {
        session_id,
        response,
    })
}
