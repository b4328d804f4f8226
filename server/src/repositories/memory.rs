//! MemoryStore - Implementazione in memoria di tutte le capability di persistenza
//!
//! Usata dai test di integrazione e dall'avvio con `STORE_BACKEND=memory`.
//! Espone anche metodi di seed e di ispezione che il dominio non usa,
//! più un'iniezione di guasti sulla scrittura dell'attrezzatura.

use super::{ChatStore, RentalStore, StoreError};
use crate::dtos::{CreateConversationDTO, CreateMessageDTO};
use crate::entities::{
    Conversation, Equipment, Message, Provider, Rental, RentalStatus, sort_by_activity,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    rentals: DashMap<Uuid, Rental>,
    equipment: DashMap<Uuid, Equipment>,
    providers: DashMap<Uuid, Provider>,
    conversations: DashMap<Uuid, Conversation>,
    /// Key: conversation_id, Value: messaggi in ordine di inserimento
    messages: DashMap<Uuid, Vec<Message>>,
    /// Numero di prossime scritture su equipment che devono fallire
    equipment_failures: AtomicU32,
    /// Numero totale di tentativi di scrittura su equipment
    equipment_writes: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ********************* SEED E ISPEZIONE **********************//

    pub fn insert_provider(&self, provider: Provider) {
        self.providers.insert(provider.id, provider);
    }

    pub fn insert_equipment(&self, equipment: Equipment) {
        self.equipment.insert(equipment.id, equipment);
    }

    pub fn insert_rental(&self, rental: Rental) {
        self.rentals.insert(rental.id, rental);
    }

    pub fn rental(&self, id: &Uuid) -> Option<Rental> {
        self.rentals.get(id).map(|r| r.value().clone())
    }

    pub fn equipment(&self, id: &Uuid) -> Option<Equipment> {
        self.equipment.get(id).map(|e| e.value().clone())
    }

    pub fn conversation(&self, id: &Uuid) -> Option<Conversation> {
        self.conversations.get(id).map(|c| c.value().clone())
    }

    /// Le prossime `count` scritture di disponibilità falliscono con `StoreError::Unavailable`
    pub fn fail_next_equipment_writes(&self, count: u32) {
        self.equipment_failures.store(count, Ordering::SeqCst);
    }

    pub fn equipment_write_attempts(&self) -> u32 {
        self.equipment_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RentalStore for MemoryStore {
    async fn find_rental(&self, id: &Uuid) -> Result<Option<Rental>, StoreError> {
        Ok(self.rental(id))
    }

    async fn find_provider(&self, id: &Uuid) -> Result<Option<Provider>, StoreError> {
        Ok(self.providers.get(id).map(|p| p.value().clone()))
    }

    #[instrument(skip(self), fields(rental_id = %id, status = %status))]
    async fn update_rental_status(&self, id: &Uuid, status: RentalStatus) -> Result<(), StoreError> {
        let mut rental = self
            .rentals
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("rental", id))?;
        rental.status = status;
        debug!("Rental status updated in memory");
        Ok(())
    }

    #[instrument(skip(self), fields(equipment_id = %id, available))]
    async fn set_equipment_availability(&self, id: &Uuid, available: bool) -> Result<(), StoreError> {
        self.equipment_writes.fetch_add(1, Ordering::SeqCst);

        let injected = self
            .equipment_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            warn!("Injected equipment write failure");
            return Err(StoreError::Unavailable("equipment table unavailable".to_string()));
        }

        let mut equipment = self
            .equipment
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("equipment", id))?;
        equipment.is_available = available;
        Ok(())
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn create_conversation(
        &self,
        data: &CreateConversationDTO,
    ) -> Result<Conversation, StoreError> {
        let conversation = Conversation {
            id: Uuid::new_v4(),
            customer_id: data.customer_id,
            customer_name: data.customer_name.clone(),
            provider_id: data.provider_id,
            provider_name: data.provider_name.clone(),
            last_message: None,
            last_message_at: None,
            created_at: data.created_at,
        };
        self.conversations
            .insert(conversation.id, conversation.clone());
        Ok(conversation)
    }

    async fn find_conversation(&self, id: &Uuid) -> Result<Option<Conversation>, StoreError> {
        Ok(self.conversation(id))
    }

    async fn find_conversation_between(
        &self,
        customer_id: &Uuid,
        provider_id: &Uuid,
    ) -> Result<Option<Conversation>, StoreError> {
        Ok(self
            .conversations
            .iter()
            .filter(|c| c.customer_id == *customer_id && c.provider_id == *provider_id)
            .map(|c| c.value().clone())
            .min_by_key(|c| c.created_at))
    }

    async fn list_conversations_for_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<Conversation>, StoreError> {
        let mut conversations: Vec<Conversation> = self
            .conversations
            .iter()
            .filter(|c| c.has_participant(user_id))
            .map(|c| c.value().clone())
            .collect();
        sort_by_activity(&mut conversations);
        Ok(conversations)
    }

    async fn insert_message(&self, data: &CreateMessageDTO) -> Result<Message, StoreError> {
        if !self.conversations.contains_key(&data.conversation_id) {
            return Err(StoreError::not_found("conversation", &data.conversation_id));
        }

        let message = Message {
            id: Uuid::new_v4(),
            conversation_id: data.conversation_id,
            sender_id: data.sender_id,
            sender_type: data.sender_type,
            message: data.message.clone(),
            read: false,
            created_at: data.created_at,
        };
        self.messages
            .entry(data.conversation_id)
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn list_messages(&self, conversation_id: &Uuid) -> Result<Vec<Message>, StoreError> {
        let mut messages = self
            .messages
            .get(conversation_id)
            .map(|m| m.value().clone())
            .unwrap_or_default();
        // sort stabile: a parità di timestamp resta l'ordine di inserimento
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    async fn update_last_message(
        &self,
        conversation_id: &Uuid,
        message: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut conversation = self
            .conversations
            .get_mut(conversation_id)
            .ok_or_else(|| StoreError::not_found("conversation", conversation_id))?;
        conversation.last_message = Some(message.to_string());
        conversation.last_message_at = Some(at);
        Ok(())
    }

    async fn mark_read(&self, conversation_id: &Uuid, reader_id: &Uuid) -> Result<u64, StoreError> {
        let mut updated = 0;
        if let Some(mut messages) = self.messages.get_mut(conversation_id) {
            for message in messages
                .iter_mut()
                .filter(|m| m.sender_id != *reader_id && !m.read)
            {
                message.read = true;
                updated += 1;
            }
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::SenderType;
    use chrono::Duration;

    fn conversation_dto(customer: Uuid, provider: Uuid, at: DateTime<Utc>) -> CreateConversationDTO {
        CreateConversationDTO {
            customer_id: customer,
            customer_name: "Carla".to_string(),
            provider_id: provider,
            provider_name: "Pietro".to_string(),
            created_at: at,
        }
    }

    #[tokio::test]
    async fn injected_failures_are_consumed_one_per_write() {
        let store = MemoryStore::new();
        let equipment_id = Uuid::new_v4();
        store.insert_equipment(Equipment { id: equipment_id, is_available: true });
        store.fail_next_equipment_writes(2);

        assert!(store.set_equipment_availability(&equipment_id, false).await.is_err());
        assert!(store.set_equipment_availability(&equipment_id, false).await.is_err());
        assert!(store.set_equipment_availability(&equipment_id, false).await.is_ok());

        assert_eq!(store.equipment_write_attempts(), 3);
        assert!(!store.equipment(&equipment_id).unwrap().is_available);
    }

    #[tokio::test]
    async fn lists_only_conversations_of_the_user_newest_first() {
        let store = MemoryStore::new();
        let (alice, bob, carol) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let now = Utc::now();

        let older = store
            .create_conversation(&conversation_dto(alice, bob, now - Duration::minutes(10)))
            .await
            .unwrap();
        let newer = store
            .create_conversation(&conversation_dto(carol, alice, now))
            .await
            .unwrap();
        store
            .create_conversation(&conversation_dto(bob, carol, now))
            .await
            .unwrap();

        let listed = store.list_conversations_for_user(&alice).await.unwrap();
        assert_eq!(
            listed.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![newer.id, older.id]
        );

        store
            .update_last_message(&older.id, "ping", now + Duration::minutes(1))
            .await
            .unwrap();
        let listed = store.list_conversations_for_user(&alice).await.unwrap();
        assert_eq!(listed[0].id, older.id);
    }

    #[tokio::test]
    async fn mark_read_skips_own_messages() {
        let store = MemoryStore::new();
        let (customer, provider) = (Uuid::new_v4(), Uuid::new_v4());
        let conversation = store
            .create_conversation(&conversation_dto(customer, provider, Utc::now()))
            .await
            .unwrap();

        for (sender, sender_type) in [
            (customer, SenderType::Customer),
            (provider, SenderType::Provider),
            (provider, SenderType::Provider),
        ] {
            store
                .insert_message(&CreateMessageDTO {
                    conversation_id: conversation.id,
                    sender_id: sender,
                    sender_type,
                    message: "hi".to_string(),
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }

        assert_eq!(store.mark_read(&conversation.id, &customer).await.unwrap(), 2);
        assert_eq!(store.mark_read(&conversation.id, &customer).await.unwrap(), 0);

        let messages = store.list_messages(&conversation.id).await.unwrap();
        assert!(!messages[0].read);
        assert!(messages[1].read && messages[2].read);
    }
}
