//! Message DTOs - Data Transfer Objects per messaggi

use crate::entities::{Message, SenderType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Struct per gestire io col client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MessageDTO {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub sender_type: SenderType,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for MessageDTO {
    fn from(value: Message) -> Self {
        Self {
            id: value.id,
            conversation_id: value.conversation_id,
            sender_id: value.sender_id,
            sender_type: value.sender_type,
            message: value.message,
            read: value.read,
            created_at: value.created_at,
        }
    }
}

/// DTO per creare un nuovo messaggio (senza id, il flag read parte da false)
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct CreateMessageDTO {
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub sender_type: SenderType,

    #[validate(length(min = 1, max = 5000, message = "Message content must be between 1 and 5000 characters"))]
    pub message: String,

    pub created_at: DateTime<Utc>,
}

/// Corpo di POST /conversations/{id}/messages
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SendMessageDTO {
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReadReceiptDTO {
    pub updated: u64,
}
