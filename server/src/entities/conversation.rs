//! Conversation entity - Conversazione tra un cliente e un fornitore

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Conversation {
    pub id: Uuid,
    // entrambi sono id utente, non id della tabella providers
    pub customer_id: Uuid,
    pub customer_name: String,
    pub provider_id: Uuid,
    pub provider_name: String,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn has_participant(&self, user_id: &Uuid) -> bool {
        self.customer_id == *user_id || self.provider_id == *user_id
    }

    /// Chiave di ordinamento delle liste: conversazioni senza messaggi usano la data di creazione
    pub fn activity_at(&self) -> DateTime<Utc> {
        self.last_message_at.unwrap_or(self.created_at)
    }
}

/// Ordina per ultima attività, la più recente in testa
pub fn sort_by_activity(conversations: &mut [Conversation]) {
    conversations.sort_by(|a, b| b.activity_at().cmp(&a.activity_at()));
}
