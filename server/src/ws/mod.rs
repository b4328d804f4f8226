//! WebSocket Module - Gestione WebSocket per comunicazione real-time
//!
//! Questo modulo gestisce il feed dei messaggi inseriti e la sua esposizione via WebSocket:
//! - Feed broadcast degli inserimenti (`feed`)
//! - Gestione upgrade HTTP -> WebSocket
//! - Gestione connessioni (split sender/receiver, batching)

pub mod connection;
pub mod feed;

pub use connection::handle_socket;
pub use feed::{MessageEvent, MessageFeed};

use crate::core::{AppState, Session};
use axum::{
    Extension,
    extract::{State, ws::WebSocketUpgrade},
    response::Response,
};
use std::sync::Arc;

/// Numero massimo di messaggi per batch inviato al client
pub const BATCH_MAX_SIZE: usize = 10;
/// Intervallo massimo di attesa prima di svuotare un batch non pieno, in millisecondi
pub const BATCH_INTERVAL: u64 = 100;
/// Chiusura della connessione se il client non invia nulla per questo tempo
pub const TIMEOUT_DURATION_SECONDS: u64 = 300;

/// Entry point per gestire richieste di upgrade WebSocket
/// Operazioni:
/// 1. Estrarre la sessione dall'autenticazione JWT
/// 2. Eseguire upgrade HTTP -> WebSocket
/// 3. Passare la connessione ad handle_socket
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Response {
    // la sottoscrizione avviene prima dell'upgrade: nessun evento va perso durante l'handshake
    let feed_rx = state.feed.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, session.user_id, feed_rx))
}
