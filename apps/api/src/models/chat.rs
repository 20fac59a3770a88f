use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Which persona a chat session talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatCategory {
    Career,
    Buddy,
}

impl ChatCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatCategory::Career => "career",
            ChatCategory::Buddy => "buddy",
        }
    }
}

impl ChatCategory {
    /// Mode name the chat UI switches on; the buddy persona keeps its old name there.
    pub fn client_mode(&self) -> &'static str {
        match self {
            ChatCategory::Career => "career",
            ChatCategory::Buddy => "kanka",
        }
    }
}

impl fmt::Display for ChatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "career" => Ok(ChatCategory::Career),
            // sessions created before the persona was renamed
            "buddy" | "kanka" => Ok(ChatCategory::Buddy),
            other => Err(format!("unknown chat category '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Ai => "ai",
        }
    }

    /// Role name the chat UI expects.
    pub fn role(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Ai => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatSessionRow {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatMessageRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub sender: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// A session with its messages, oldest message first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSessionView {
    pub id: Uuid,
    pub title: String,
    pub mode: &'static str,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<ChatMessageView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessageView {
    pub id: Uuid,
    pub role: &'static str,
    pub content: String,
}

impl ChatSessionView {
    pub fn from_rows(session: ChatSessionRow, messages: Vec<ChatMessageRow>) -> Self {
        let mode = session
            .category
            .parse()
            .unwrap_or(ChatCategory::Career)
            .client_mode();
        Self {
            id: session.id,
            title: session.title,
            mode,
            created_at: session.created_at,
            messages: messages
                .into_iter()
                .map(|m| ChatMessageView {
                    id: m.id,
                    role: if m.sender == Sender::User.as_str() {
                        Sender::User.role()
                    } else {
                        Sender::Ai.role()
                    },
                    content: m.message,
                })
                .collect(),
        }
    }
}
