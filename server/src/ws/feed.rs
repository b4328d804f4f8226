use crate::entities::{Conversation, Message};
use std::sync::Arc;
use tokio::sync::broadcast::{self, Receiver, Sender};
use tracing::{debug, instrument};
use uuid::Uuid;

pub const DEFAULT_FEED_CAPACITY: usize = 1024;

/// Evento di inserimento nella tabella messaggi.
/// Porta con sé i partecipanti per poter filtrare senza ulteriori query.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    pub message: Message,
    pub customer_id: Uuid,
    pub provider_id: Uuid,
}

impl MessageEvent {
    pub fn new(message: Message, conversation: &Conversation) -> Self {
        Self {
            message,
            customer_id: conversation.customer_id,
            provider_id: conversation.provider_id,
        }
    }

    pub fn concerns(&self, user_id: &Uuid) -> bool {
        self.customer_id == *user_id || self.provider_id == *user_id
    }
}

/// Canale broadcast unico per tutti gli inserimenti di messaggi.
/// Ogni subscriber riceve tutti gli eventi e filtra quelli che lo riguardano.
#[derive(Clone)]
pub struct MessageFeed {
    tx: Sender<Arc<MessageEvent>>,
}

impl MessageFeed {
    pub fn new(capacity: usize) -> Self {
        // ogni receiver riceve un Arc, il messaggio non viene copiato
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> Receiver<Arc<MessageEvent>> {
        self.tx.subscribe()
    }

    /// Pubblica un inserimento. Ritorna il numero di subscriber raggiunti;
    /// nessun subscriber attivo non è un errore.
    #[instrument(skip(self, event), fields(message_id = %event.message.id))]
    pub fn publish(&self, event: MessageEvent) -> usize {
        match self.tx.send(Arc::new(event)) {
            Ok(n) => {
                debug!(receivers = n, "Message event broadcast");
                n
            }
            Err(_) => {
                debug!("No active subscribers for message event");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
