use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::modules::conversation::model::Sender;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    #[validate(length(min = 1, message = "userId cannot be empty"))]
    pub user_id: String,
    #[validate(length(max = 100, message = "Title too long"))]
    pub title: Option<String>,
    pub initial_message: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateConversationRequest {
    #[validate(length(min = 1, max = 100, message = "Title must be 1-100 characters"))]
    pub title: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddMessageRequest {
    #[validate(length(min = 1, message = "Text cannot be empty"))]
    pub text: String,
    #[serde(default)]
    pub sender: Sender,
    pub language: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, message = "Message cannot be empty"))]
    pub message: String,
    pub language: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    #[validate(length(min = 1, message = "Message cannot be empty"))]
    pub message: String,
    #[validate(length(min = 1, message = "conversationId cannot be empty"))]
    pub conversation_id: String,
    pub target_language: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedResponse {
    pub inserted_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub language: String,
    pub messages: Vec<MessageResponse>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct MessageResponse {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    pub language: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMessageResponse {
    pub status: &'static str,
    pub message_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub message_id: String,
    pub reply: String,
    pub language: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub message_id: String,
    pub translation: String,
    pub original: String,
    pub language: String,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StatusMessage {
    pub message: String,
}
