//! Common repository traits
//!
//! This module defines the store capabilities the domain depends on:
//! "fetch rows matching filter", "insert row" and "update row".
//! The fourth capability, "subscribe to insert events", lives in `ws::feed`.

use super::StoreError;
use crate::dtos::{CreateConversationDTO, CreateMessageDTO};
use crate::entities::{Conversation, Message, Provider, Rental, RentalStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Rows touched by the rental status synchronizer
#[async_trait]
pub trait RentalStore: Send + Sync {
    /// Reads a rental by primary key
    ///
    /// # Returns
    /// * `Ok(Some(Rental))` - Rental found
    /// * `Ok(None)` - No rental with that ID
    async fn find_rental(&self, id: &Uuid) -> Result<Option<Rental>, StoreError>;

    /// Reads the provider owning a rental
    async fn find_provider(&self, id: &Uuid) -> Result<Option<Provider>, StoreError>;

    /// Overwrites the status of an existing rental. No transition guard is applied.
    async fn update_rental_status(&self, id: &Uuid, status: RentalStatus) -> Result<(), StoreError>;

    /// Sets the availability flag of a piece of equipment.
    ///
    /// Idempotent: applying the same value twice leaves the row unchanged,
    /// so callers may retry it freely.
    async fn set_equipment_availability(&self, id: &Uuid, available: bool) -> Result<(), StoreError>;
}

/// Rows touched by the conversation relay
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Inserts a new conversation
    ///
    /// # Returns
    /// * `Ok(Conversation)` - Created conversation with ID assigned by the store
    async fn create_conversation(
        &self,
        data: &CreateConversationDTO,
    ) -> Result<Conversation, StoreError>;

    async fn find_conversation(&self, id: &Uuid) -> Result<Option<Conversation>, StoreError>;

    /// Looks up the conversation between a customer and a provider, if any
    async fn find_conversation_between(
        &self,
        customer_id: &Uuid,
        provider_id: &Uuid,
    ) -> Result<Option<Conversation>, StoreError>;

    /// Conversations where the user is customer or provider, most recent activity first
    async fn list_conversations_for_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<Conversation>, StoreError>;

    /// Appends a message to a conversation
    async fn insert_message(&self, data: &CreateMessageDTO) -> Result<Message, StoreError>;

    /// Messages of a conversation, oldest first
    async fn list_messages(&self, conversation_id: &Uuid) -> Result<Vec<Message>, StoreError>;

    /// Mirrors the latest message into the parent conversation
    async fn update_last_message(
        &self,
        conversation_id: &Uuid,
        message: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Marks as read every message of the conversation not sent by `reader_id`
    ///
    /// # Returns
    /// * `Ok(u64)` - Number of messages that changed state
    async fn mark_read(&self, conversation_id: &Uuid, reader_id: &Uuid) -> Result<u64, StoreError>;
}
