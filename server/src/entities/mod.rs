//! Entities module - Entità del dominio applicativo
//!
//! Questo modulo contiene tutte le entità (models) che rappresentano i dati persistiti nel database.
//! Ogni entity corrisponde a una tabella nel database.

pub mod conversation;
pub mod enums;
pub mod equipment;
pub mod message;
pub mod provider;
pub mod rental;

// Re-exports per facilitare l'import
pub use conversation::{Conversation, sort_by_activity};
pub use enums::{RentalStatus, SenderType};
pub use equipment::Equipment;
pub use message::Message;
pub use provider::Provider;
pub use rental::Rental;
