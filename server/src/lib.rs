//! Server library - espone i moduli principali per i test

pub mod core;
pub mod dtos;
pub mod entities;
pub mod relay;
pub mod repositories;
pub mod services;
pub mod ws;

// Re-export dei tipi principali per facilitare l'import
pub use crate::core::{AppError, AppState, auth, config};
pub use relay::Relay;
pub use services::root;

use axum::{
    Router,
    http::StatusCode,
    middleware,
    routing::{any, get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Crea il router principale dell'applicazione
pub fn create_router(state: Arc<AppState>) -> Router {
    use crate::core::authentication_middleware;
    use ws::ws_handler;

    Router::new()
        .route("/", get(root))
        .nest("/functions", configure_function_routes(state.clone()))
        .nest("/conversations", configure_conversation_routes(state.clone()))
        .route(
            "/ws",
            any(ws_handler).layer(middleware::from_fn_with_state(
                state.clone(),
                authentication_middleware,
            )),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Configura le funzioni invocate dai client browser (CORS permissivo)
fn configure_function_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::authentication_middleware;
    use services::*;

    // OPTIONS resta fuori dall'autenticazione: il preflight non porta credenziali
    Router::new()
        .route(
            "/update-rental-status",
            post(update_rental_status)
                .layer(middleware::from_fn_with_state(
                    state,
                    authentication_middleware,
                ))
                .options(preflight),
        )
        .layer(CorsLayer::permissive())
}

/// Configura le routes per conversazioni e messaggi
fn configure_conversation_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::{authentication_middleware, conversation_participant_middleware};
    use services::*;

    // Rotte che NON richiedono partecipazione (solo autenticazione)
    let public_routes = Router::new()
        .route("/", get(list_conversations).post(start_conversation))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            authentication_middleware,
        ));

    // Rotte che richiedono partecipazione (autenticazione + participant middleware)
    let participant_routes = Router::new()
        .route(
            "/{conversation_id}/messages",
            get(get_conversation_messages).post(send_message),
        )
        .route("/{conversation_id}/read", post(mark_conversation_read))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            conversation_participant_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ));

    public_routes.merge(participant_routes)
}

/// Risposta ad un OPTIONS senza header di preflight; quelli veri li chiude CorsLayer
async fn preflight() -> StatusCode {
    StatusCode::OK
}
