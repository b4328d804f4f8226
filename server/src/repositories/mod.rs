//! Repositories module - Coordinatore per tutti i repository del progetto
//!
//! Il dominio vede la persistenza solo attraverso due capability astratte:
//! `RentalStore` (noleggi, attrezzature, fornitori) e `ChatStore` (conversazioni e messaggi).
//! Ogni capability ha due implementazioni:
//! - MySQL tramite sqlx, usata in produzione
//! - in memoria tramite dashmap, usata dai test e con `STORE_BACKEND=memory`
//!
//! Le query MySQL usano `query`/`query_as` verificate a runtime con `FromRow`,
//! così la compilazione non richiede un database raggiungibile.

pub mod chat;
pub mod error;
pub mod memory;
pub mod rental;
pub mod traits;

pub use chat::MySqlChatRepository;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use rental::MySqlRentalRepository;
pub use traits::{ChatStore, RentalStore};
