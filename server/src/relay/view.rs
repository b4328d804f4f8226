//! Relay - Stato locale delle conversazioni di un utente
//!
//! Il Relay tiene in memoria la lista delle conversazioni e lo storico dei messaggi
//! già caricati, e li riconcilia con il feed live degli inserimenti:
//! - eventi di conversazioni non presenti localmente vengono scartati
//! - eventi già visti (fetch iniziale o invio locale) vengono deduplicati per id
//! - dopo ogni aggiornamento la lista resta ordinata per ultima attività decrescente
//!
//! Non ha lock interni: tutti i metodi che modificano lo stato prendono `&mut self`.

use crate::core::{AppError, Session};
use crate::entities::{Conversation, Message, sort_by_activity};
use crate::relay::ops;
use crate::repositories::ChatStore;
use crate::ws::{MessageEvent, MessageFeed};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

pub struct Relay {
    session: Session,
    chats: Arc<dyn ChatStore>,
    feed: MessageFeed,
    conversations: Vec<Conversation>,
    /// Key: conversation_id, presente solo per le conversazioni di cui è stato caricato lo storico
    messages: HashMap<Uuid, Vec<Message>>,
    /// Id di tutti i messaggi già incorporati
    seen: HashSet<Uuid>,
    live: Option<Receiver<Arc<MessageEvent>>>,
}

impl Relay {
    pub fn new(session: Session, chats: Arc<dyn ChatStore>, feed: MessageFeed) -> Self {
        Self {
            session,
            chats,
            feed,
            conversations: Vec::new(),
            messages: HashMap::new(),
            seen: HashSet::new(),
            live: None,
        }
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Storico locale della conversazione, vuoto se non ancora caricato
    pub fn messages(&self, conversation_id: &Uuid) -> &[Message] {
        self.messages
            .get(conversation_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    // ********************* OPERAZIONI SULLO STORE **********************//

    /// Ricarica la lista delle conversazioni dell'utente
    #[instrument(skip(self), fields(user_id = %self.session.user_id))]
    pub async fn list_conversations(&mut self) -> Result<&[Conversation], AppError> {
        let conversations = ops::list_conversations(self.chats.as_ref(), &self.session.user_id).await?;

        // lo storico delle conversazioni non più presenti non serve più
        let held: HashSet<Uuid> = conversations.iter().map(|c| c.id).collect();
        self.messages.retain(|id, _| held.contains(id));
        self.seen = self
            .messages
            .values()
            .flatten()
            .map(|m| m.id)
            .collect();

        self.conversations = conversations;
        sort_by_activity(&mut self.conversations);
        Ok(&self.conversations)
    }

    /// Carica lo storico della conversazione, dal messaggio più vecchio
    #[instrument(skip(self), fields(user_id = %self.session.user_id, conversation_id = %conversation_id))]
    pub async fn list_messages(&mut self, conversation_id: &Uuid) -> Result<&[Message], AppError> {
        let conversation = self.participant_conversation(conversation_id).await?;
        let messages = ops::list_messages(self.chats.as_ref(), &conversation.id).await?;

        self.seen.extend(messages.iter().map(|m| m.id));
        self.hold(conversation);
        self.messages.insert(*conversation_id, messages);
        Ok(self.messages(conversation_id))
    }

    /// Invia un messaggio come utente della sessione; il tipo di mittente
    /// dipende dal lato della conversazione occupato dall'utente
    #[instrument(skip(self, text), fields(user_id = %self.session.user_id, conversation_id = %conversation_id))]
    pub async fn send_message(&mut self, conversation_id: &Uuid, text: &str) -> Result<Message, AppError> {
        let conversation = self.participant_conversation(conversation_id).await?;
        let sender_type = ops::sender_type_for(&conversation, &self.session.user_id)
            .ok_or_else(|| AppError::forbidden("You are not a participant of this conversation"))?;

        let message = ops::send_message(
            self.chats.as_ref(),
            &self.feed,
            &conversation,
            &self.session.user_id,
            sender_type,
            text,
        )
        .await?;

        self.hold(conversation);
        // stesso percorso degli eventi live: l'eco dal feed verrà scartata come duplicato
        self.absorb(message.clone());
        Ok(message)
    }

    /// Avvia una conversazione con un fornitore, l'utente della sessione è il cliente
    #[instrument(skip(self, customer_name, provider_name, initial_message), fields(user_id = %self.session.user_id, provider_id = %provider_id))]
    pub async fn start_conversation(
        &mut self,
        customer_name: &str,
        provider_id: &Uuid,
        provider_name: &str,
        initial_message: &str,
    ) -> Result<Conversation, AppError> {
        let (conversation, message) = ops::start_conversation(
            self.chats.as_ref(),
            &self.feed,
            &self.session.user_id,
            customer_name,
            provider_id,
            provider_name,
            initial_message,
        )
        .await?;

        self.hold(conversation.clone());
        self.absorb(message);
        Ok(conversation)
    }

    /// Segna come letti i messaggi ricevuti, anche nelle copie locali
    #[instrument(skip(self), fields(user_id = %self.session.user_id, conversation_id = %conversation_id))]
    pub async fn mark_read(&mut self, conversation_id: &Uuid) -> Result<u64, AppError> {
        let conversation = self.participant_conversation(conversation_id).await?;
        let updated = ops::mark_read(self.chats.as_ref(), &conversation.id, &self.session.user_id).await?;

        let reader = self.session.user_id;
        if let Some(messages) = self.messages.get_mut(conversation_id) {
            messages
                .iter_mut()
                .filter(|m| m.sender_id != reader)
                .for_each(|m| m.read = true);
        }
        Ok(updated)
    }

    // ********************* FEED LIVE **********************//

    pub fn subscribe(&mut self) {
        if self.live.is_none() {
            info!("Subscribing to message feed");
            self.live = Some(self.feed.subscribe());
        }
    }

    /// Stacca il Relay dal feed; avviene anche al drop
    pub fn unsubscribe(&mut self) {
        if self.live.take().is_some() {
            info!("Unsubscribed from message feed");
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.live.is_some()
    }

    /// Incorpora un messaggio arrivato dal feed.
    /// Ritorna `true` se ha modificato lo stato locale.
    pub fn apply_event(&mut self, message: Message) -> bool {
        self.absorb(message)
    }

    /// Applica tutti gli eventi già in coda senza attendere.
    /// Ritorna il numero di eventi che hanno modificato lo stato locale.
    pub fn drain_live(&mut self) -> usize {
        let mut applied = 0;
        loop {
            let Some(rx) = self.live.as_mut() else {
                return applied;
            };
            match rx.try_recv() {
                Ok(event) => {
                    if self.absorb(event.message.clone()) {
                        applied += 1;
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Relay lagged behind the message feed");
                }
                Err(TryRecvError::Empty) => return applied,
                Err(TryRecvError::Closed) => {
                    warn!("Message feed closed");
                    self.live = None;
                    return applied;
                }
            }
        }
    }

    /// Attende il prossimo evento che modifica lo stato locale e lo ritorna.
    /// `None` se il Relay non è sottoscritto o il feed è stato chiuso.
    pub async fn next_live(&mut self) -> Option<Message> {
        loop {
            let rx = self.live.as_mut()?;
            match rx.recv().await {
                Ok(event) => {
                    if self.absorb(event.message.clone()) {
                        return Some(event.message.clone());
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Relay lagged behind the message feed");
                }
                Err(RecvError::Closed) => {
                    warn!("Message feed closed");
                    self.live = None;
                    return None;
                }
            }
        }
    }

    // ********************* RICONCILIAZIONE **********************//

    fn absorb(&mut self, message: Message) -> bool {
        if self.seen.contains(&message.id) {
            debug!(message_id = %message.id, "Duplicate message ignored");
            return false;
        }
        let Some(conversation) = self
            .conversations
            .iter_mut()
            .find(|c| c.id == message.conversation_id)
        else {
            debug!(conversation_id = %message.conversation_id, "Message for a conversation not held locally dropped");
            return false;
        };

        // un evento più vecchio dell'ultimo messaggio noto non deve riportarlo indietro
        if conversation
            .last_message_at
            .is_none_or(|at| at <= message.created_at)
        {
            conversation.last_message = Some(message.message.clone());
            conversation.last_message_at = Some(message.created_at);
        }

        self.seen.insert(message.id);
        if let Some(history) = self.messages.get_mut(&message.conversation_id) {
            history.push(message);
        }
        sort_by_activity(&mut self.conversations);
        true
    }

    /// Inserisce o sostituisce una conversazione nella lista locale
    fn hold(&mut self, conversation: Conversation) {
        match self.conversations.iter_mut().find(|c| c.id == conversation.id) {
            Some(existing) => {
                // la copia locale può essere più aggiornata di quella letta dallo store
                if existing.activity_at() <= conversation.activity_at() {
                    *existing = conversation;
                }
            }
            None => self.conversations.push(conversation),
        }
        sort_by_activity(&mut self.conversations);
    }

    /// Conversazione a cui partecipa l'utente della sessione, locale o letta dallo store
    async fn participant_conversation(&self, conversation_id: &Uuid) -> Result<Conversation, AppError> {
        let conversation = match self.conversations.iter().find(|c| c.id == *conversation_id) {
            Some(local) => local.clone(),
            None => self
                .chats
                .find_conversation(conversation_id)
                .await?
                .ok_or_else(|| AppError::not_found("Conversation not found"))?,
        };

        if !conversation.has_participant(&self.session.user_id) {
            warn!("User is not a participant of conversation {}", conversation_id);
            return Err(AppError::forbidden("You are not a participant of this conversation"));
        }
        Ok(conversation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::MemoryStore;

    #[tokio::test]
    async fn refresh_keeps_seen_ids_only_for_loaded_histories() {
        let store = Arc::new(MemoryStore::new());
        let feed = MessageFeed::new(16);
        let customer = Uuid::new_v4();
        let mut relay = Relay::new(Session { user_id: customer }, store.clone(), feed.clone());

        let first = relay
            .start_conversation("Carla", &Uuid::new_v4(), "Pietro", "Ciao")
            .await
            .unwrap();
        relay
            .start_conversation("Carla", &Uuid::new_v4(), "Giulia", "Salve")
            .await
            .unwrap();
        assert_eq!(relay.seen.len(), 2);

        relay.list_messages(&first.id).await.unwrap();
        relay.list_conversations().await.unwrap();
        assert_eq!(relay.seen.len(), 1);
        assert!(relay.seen.contains(&relay.messages(&first.id)[0].id));

        // lo storico caricato resta deduplicato dopo il refresh
        let echoed = relay.messages(&first.id)[0].clone();
        assert!(!relay.apply_event(echoed));
        assert_eq!(relay.messages(&first.id).len(), 1);
    }
}
