use async_trait::async_trait;
use thiserror::Error;

use crate::modules::conversation::model::{Conversation, Message};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] bson::ser::Error),
}

/// Single-document persistence for conversations, keyed by opaque id.
///
/// Lookups that find nothing return `None` / `false` rather than an error.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create(&self, conversation: Conversation) -> Result<String, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Conversation>, StoreError>;

    /// Newest first.
    async fn find_by_user(&self, user_id: &str, limit: i64) -> Result<Vec<Conversation>, StoreError>;

    /// Appends all `messages` in one write, or none of them.
    async fn add_messages(&self, id: &str, messages: Vec<Message>) -> Result<bool, StoreError>;

    async fn add_message(&self, id: &str, message: Message) -> Result<bool, StoreError> {
        self.add_messages(id, vec![message]).await
    }

    async fn update_title(&self, id: &str, title: String) -> Result<bool, StoreError>;

    async fn delete(&self, id: &str) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    fn backend(&self) -> &'static str;
}
