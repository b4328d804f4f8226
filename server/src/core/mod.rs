//! Core Module - Componenti infrastrutturali dell'applicazione
//!
//! Questo modulo contiene tutti i componenti "core" dell'applicazione:
//! - Autenticazione JWT e sessione del chiamante
//! - Configurazione e logging
//! - Gestione errori
//! - Stato applicazione

pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod state;

// Re-exports per facilitare l'import
pub use auth::{
    Claims, Session, authentication_middleware, conversation_participant_middleware, decode_jwt,
    encode_jwt,
};
pub use config::Config;
pub use error::AppError;
pub use state::AppState;
