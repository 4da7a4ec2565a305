use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::llm::ChatTurn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    #[default]
    User,
    #[serde(alias = "ai", alias = "assistant")]
    Bot,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Message {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    pub language: Option<String>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(sender: Sender, text: String, language: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender,
            text,
            language,
            timestamp: Utc::now(),
        }
    }

    pub fn user(text: String, language: Option<String>) -> Self {
        Self::new(Sender::User, text, language)
    }

    pub fn bot(text: String, language: Option<String>) -> Self {
        Self::new(Sender::Bot, text, language)
    }

    pub fn to_chat_turn(&self) -> ChatTurn {
        match self.sender {
            Sender::User => ChatTurn::user(self.text.clone()),
            Sender::Bot => ChatTurn::assistant(self.text.clone()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Conversation {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub language: String,
    pub messages: Vec<Message>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(user_id: String, title: Option<String>, language: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            title: title.unwrap_or_else(|| format!("Chat {}", now.format("%Y-%m-%d"))),
            language,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn get_context_messages(&self, limit: usize) -> &[Message] {
        let len = self.messages.len();
        &self.messages[len.saturating_sub(limit)..]
    }
}
