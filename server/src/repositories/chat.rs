//! MySqlChatRepository - Repository per conversazioni e messaggi

use super::{ChatStore, StoreError};
use crate::dtos::{CreateConversationDTO, CreateMessageDTO};
use crate::entities::{Conversation, Message};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::MySqlPool;
use tracing::{debug, info, instrument};
use uuid::Uuid;

const CONVERSATION_COLUMNS: &str = "id, customer_id, customer_name, provider_id, provider_name, \
     last_message, last_message_at, created_at";

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, sender_type, message, `read`, created_at";

// CHAT REPOSITORY
pub struct MySqlChatRepository {
    connection_pool: MySqlPool,
}

impl MySqlChatRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }
}

#[async_trait]
impl ChatStore for MySqlChatRepository {
    #[instrument(skip(self, data), fields(customer_id = %data.customer_id, provider_id = %data.provider_id))]
    async fn create_conversation(
        &self,
        data: &CreateConversationDTO,
    ) -> Result<Conversation, StoreError> {
        debug!("Creating new conversation");
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO conversations (id, customer_id, customer_name, provider_id, provider_name, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(data.customer_id)
        .bind(&data.customer_name)
        .bind(data.provider_id)
        .bind(&data.provider_name)
        .bind(data.created_at)
        .execute(&self.connection_pool)
        .await?;

        info!("Conversation created with id {}", id);

        Ok(Conversation {
            id,
            customer_id: data.customer_id,
            customer_name: data.customer_name.clone(),
            provider_id: data.provider_id,
            provider_name: data.provider_name.clone(),
            last_message: None,
            last_message_at: None,
            created_at: data.created_at,
        })
    }

    #[instrument(skip(self), fields(conversation_id = %id))]
    async fn find_conversation(&self, id: &Uuid) -> Result<Option<Conversation>, StoreError> {
        let conversation = sqlx::query_as::<_, Conversation>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await?;

        Ok(conversation)
    }

    #[instrument(skip(self), fields(customer_id = %customer_id, provider_id = %provider_id))]
    async fn find_conversation_between(
        &self,
        customer_id: &Uuid,
        provider_id: &Uuid,
    ) -> Result<Option<Conversation>, StoreError> {
        debug!("Looking for existing conversation");
        let conversation = sqlx::query_as::<_, Conversation>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations \
             WHERE customer_id = ? AND provider_id = ? \
             ORDER BY created_at ASC LIMIT 1"
        ))
        .bind(customer_id)
        .bind(provider_id)
        .fetch_optional(&self.connection_pool)
        .await?;

        Ok(conversation)
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn list_conversations_for_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<Conversation>, StoreError> {
        let conversations = sqlx::query_as::<_, Conversation>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations \
             WHERE customer_id = ? OR provider_id = ? \
             ORDER BY COALESCE(last_message_at, created_at) DESC"
        ))
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.connection_pool)
        .await?;

        debug!("Found {} conversations", conversations.len());
        Ok(conversations)
    }

    #[instrument(skip(self, data), fields(conversation_id = %data.conversation_id, sender_id = %data.sender_id))]
    async fn insert_message(&self, data: &CreateMessageDTO) -> Result<Message, StoreError> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO messages (id, conversation_id, sender_id, sender_type, message, `read`, created_at)
            VALUES (?, ?, ?, ?, ?, FALSE, ?)
            "#,
        )
        .bind(id)
        .bind(data.conversation_id)
        .bind(data.sender_id)
        .bind(data.sender_type)
        .bind(&data.message)
        .bind(data.created_at)
        .execute(&self.connection_pool)
        .await?;

        info!("Message stored with id {}", id);

        Ok(Message {
            id,
            conversation_id: data.conversation_id,
            sender_id: data.sender_id,
            sender_type: data.sender_type,
            message: data.message.clone(),
            read: false,
            created_at: data.created_at,
        })
    }

    #[instrument(skip(self), fields(conversation_id = %conversation_id))]
    async fn list_messages(&self, conversation_id: &Uuid) -> Result<Vec<Message>, StoreError> {
        let messages = sqlx::query_as::<_, Message>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ? ORDER BY created_at ASC"
        ))
        .bind(conversation_id)
        .fetch_all(&self.connection_pool)
        .await?;

        Ok(messages)
    }

    #[instrument(skip(self, message), fields(conversation_id = %conversation_id))]
    async fn update_last_message(
        &self,
        conversation_id: &Uuid,
        message: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE conversations SET last_message = ?, last_message_at = ? WHERE id = ?",
        )
        .bind(message)
        .bind(at)
        .bind(conversation_id)
        .execute(&self.connection_pool)
        .await?;

        if result.rows_affected() == 0 && self.find_conversation(conversation_id).await?.is_none() {
            return Err(StoreError::not_found("conversation", conversation_id));
        }

        Ok(())
    }

    #[instrument(skip(self), fields(conversation_id = %conversation_id, reader_id = %reader_id))]
    async fn mark_read(&self, conversation_id: &Uuid, reader_id: &Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE messages SET `read` = TRUE \
             WHERE conversation_id = ? AND sender_id <> ? AND `read` = FALSE",
        )
        .bind(conversation_id)
        .bind(reader_id)
        .execute(&self.connection_pool)
        .await?;

        info!("Marked {} messages as read", result.rows_affected());
        Ok(result.rows_affected())
    }
}
