//! Conversation DTOs - Data Transfer Objects per conversazioni

use crate::entities::Conversation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Struct per gestire io col client
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ConversationDTO {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub provider_id: Uuid,
    pub provider_name: String,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl From<Conversation> for ConversationDTO {
    fn from(value: Conversation) -> Self {
        Self {
            id: value.id,
            customer_id: value.customer_id,
            customer_name: value.customer_name,
            provider_id: value.provider_id,
            provider_name: value.provider_name,
            last_message: value.last_message,
            last_message_at: value.last_message_at,
        }
    }
}

/// DTO per creare una nuova conversazione (senza id, senza ultimo messaggio)
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct CreateConversationDTO {
    pub customer_id: Uuid,
    #[validate(length(min = 1, max = 100, message = "Customer name must be between 1 and 100 characters"))]
    pub customer_name: String,
    pub provider_id: Uuid,
    #[validate(length(min = 1, max = 100, message = "Provider name must be between 1 and 100 characters"))]
    pub provider_name: String,
    pub created_at: DateTime<Utc>,
}

/// Corpo di POST /conversations: il cliente è sempre l'utente autenticato
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StartConversationDTO {
    pub customer_name: String,
    pub provider_id: Uuid,
    pub provider_name: String,
    pub message: String,
}
