//! Application State - Stato globale dell'applicazione
//!
//! Contiene le capability di persistenza, il feed dei messaggi inseriti e la configurazione
//! condivisa necessaria per gestire l'applicazione.

use crate::core::config::SyncRetryPolicy;
use crate::repositories::{ChatStore, MemoryStore, MySqlChatRepository, MySqlRentalRepository, RentalStore};
use crate::ws::feed::{DEFAULT_FEED_CAPACITY, MessageFeed};
use sqlx::MySqlPool;
use std::sync::Arc;

/// Stato globale dell'applicazione condiviso tra tutte le route e middleware
pub struct AppState {
    /// Noleggi, attrezzature e fornitori
    pub rentals: Arc<dyn RentalStore>,

    /// Conversazioni e messaggi
    pub chats: Arc<dyn ChatStore>,

    /// Feed degli inserimenti nella tabella messaggi
    pub feed: MessageFeed,

    /// Secret key per JWT token
    pub jwt_secret: String,

    /// Retry della scrittura di disponibilità dopo un cambio di stato
    pub equipment_sync: SyncRetryPolicy,
}

impl AppState {
    /// Crea una nuova istanza di AppState a partire da capability già costruite
    pub fn new(rentals: Arc<dyn RentalStore>, chats: Arc<dyn ChatStore>, jwt_secret: String) -> Self {
        Self {
            rentals,
            chats,
            feed: MessageFeed::new(DEFAULT_FEED_CAPACITY),
            jwt_secret,
            equipment_sync: SyncRetryPolicy::default(),
        }
    }

    /// Inizializza tutti i repository MySQL con il pool di connessioni fornito
    pub fn mysql(pool: MySqlPool, jwt_secret: String) -> Self {
        Self::new(
            Arc::new(MySqlRentalRepository::new(pool.clone())),
            Arc::new(MySqlChatRepository::new(pool)),
            jwt_secret,
        )
    }

    /// Usa lo stesso MemoryStore per entrambe le capability
    pub fn memory(store: Arc<MemoryStore>, jwt_secret: String) -> Self {
        Self::new(store.clone(), store, jwt_secret)
    }

    pub fn with_equipment_sync(mut self, policy: SyncRetryPolicy) -> Self {
        self.equipment_sync = policy;
        self
    }

    pub fn with_feed_capacity(mut self, capacity: usize) -> Self {
        self.feed = MessageFeed::new(capacity);
        self
    }
}
