use async_trait::async_trait;
use bson::doc;
use futures::TryStreamExt;
use mongodb::{Collection, Database};

use crate::modules::conversation::model::{Conversation, Message};
use crate::modules::conversation::store::{ConversationStore, StoreError};

const COLLECTION_NAME: &str = "conversations";

pub struct MongoConversationStore {
    db: Database,
    collection: Collection<Conversation>,
}

impl MongoConversationStore {
    pub fn new(db: &Database) -> Self {
        Self {
            db: db.clone(),
            collection: db.collection(COLLECTION_NAME),
        }
    }
}

#[async_trait]
impl ConversationStore for MongoConversationStore {
    async fn create(&self, conversation: Conversation) -> Result<String, StoreError> {
        let id = conversation.id.clone();
        self.collection.insert_one(conversation).await?;
        Ok(id)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Conversation>, StoreError> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_by_user(&self, user_id: &str, limit: i64) -> Result<Vec<Conversation>, StoreError> {
        let cursor = self
            .collection
            .find(doc! { "user_id": user_id })
            .sort(doc! { "created_at": -1 })
            .limit(limit)
            .await?;

        Ok(cursor.try_collect().await?)
    }

    async fn add_messages(&self, id: &str, messages: Vec<Message>) -> Result<bool, StoreError> {
        let result = self
            .collection
            .update_one(
                doc! { "_id": id },
                doc! {
                    "$push": { "messages": { "$each": bson::to_bson(&messages)? } },
                    "$set": { "updated_at": bson::DateTime::now() }
                },
            )
            .await?;

        Ok(result.matched_count > 0)
    }

    async fn update_title(&self, id: &str, title: String) -> Result<bool, StoreError> {
        let result = self
            .collection
            .update_one(
                doc! { "_id": id },
                doc! {
                    "$set": {
                        "title": title,
                        "updated_at": bson::DateTime::now()
                    }
                },
            )
            .await?;

        Ok(result.matched_count > 0)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "mongodb"
    }
}
