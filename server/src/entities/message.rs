//! Message entity - Entità messaggio

use super::enums::SenderType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub sender_type: SenderType,
    // campo chiamato `message` e non `content` per coerenza con lo schema della tabella
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
