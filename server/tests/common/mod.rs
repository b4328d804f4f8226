#![allow(dead_code)]

use axum_test::TestServer;
use marketplace_server::AppState;
use marketplace_server::auth::encode_jwt;
use marketplace_server::config::SyncRetryPolicy;
use marketplace_server::entities::{Equipment, Provider, Rental, RentalStatus};
use marketplace_server::repositories::MemoryStore;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const JWT_SECRET: &str = "ilmiobellissimosegretochevaassolutamentecambiato";

/// Politica di retry rapida per non rallentare i test
pub fn fast_retry_policy() -> SyncRetryPolicy {
    SyncRetryPolicy {
        attempts: 3,
        min_backoff: Duration::from_millis(1),
    }
}

/// Crea un AppState in memoria per i test
///
/// # Arguments
/// * `store` - MemoryStore condiviso, usato anche per seed e verifiche
///
/// # Returns
/// Arc<AppState> configurato con il JWT secret di test
pub fn create_test_state(store: Arc<MemoryStore>) -> Arc<AppState> {
    Arc::new(
        AppState::memory(store, JWT_SECRET.to_string()).with_equipment_sync(fast_retry_policy()),
    )
}

/// Crea un TestServer per i test
pub fn create_test_server(state: Arc<AppState>) -> TestServer {
    let app = marketplace_server::create_router(state);
    TestServer::new(app).expect("Failed to create test server")
}

/// TestServer su trasporto HTTP reale, necessario per i WebSocket
pub fn create_http_test_server(state: Arc<AppState>) -> TestServer {
    let app = marketplace_server::create_router(state);
    TestServer::builder()
        .http_transport()
        .build(app)
        .expect("Failed to create http test server")
}

/// Genera un JWT token per testing, valido per 24 ore
pub fn create_test_jwt(user_id: Uuid) -> String {
    encode_jwt(user_id, JWT_SECRET).expect("Failed to create JWT token")
}

pub fn bearer(user_id: Uuid) -> String {
    format!("Bearer {}", create_test_jwt(user_id))
}

/// Noleggio con fornitore e attrezzatura già presenti nello store
pub struct RentalFixture {
    pub owner_user_id: Uuid,
    pub provider_id: Uuid,
    pub equipment_id: Uuid,
    pub rental_id: Uuid,
}

pub fn seed_rental(store: &MemoryStore, status: RentalStatus, equipment_available: bool) -> RentalFixture {
    let fixture = RentalFixture {
        owner_user_id: Uuid::new_v4(),
        provider_id: Uuid::new_v4(),
        equipment_id: Uuid::new_v4(),
        rental_id: Uuid::new_v4(),
    };
    store.insert_provider(Provider {
        id: fixture.provider_id,
        user_id: fixture.owner_user_id,
    });
    store.insert_equipment(Equipment {
        id: fixture.equipment_id,
        is_available: equipment_available,
    });
    store.insert_rental(Rental {
        id: fixture.rental_id,
        equipment_id: fixture.equipment_id,
        provider_id: fixture.provider_id,
        status,
    });
    fixture
}
