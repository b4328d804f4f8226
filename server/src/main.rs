use marketplace_server::config::{Config, ConfigError, StoreBackend};
use marketplace_server::core::logging::init_logging;
use marketplace_server::repositories::MemoryStore;
use marketplace_server::{AppState, create_router};
use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Inizializza la configurazione e il logging
    let config = Config::from_env()?;
    init_logging(config.log_format);
    config.print_info();

    let state = match config.store_backend {
        StoreBackend::MySql => {
            let url = config
                .database_url
                .as_deref()
                .ok_or(ConfigError::Missing("DATABASE_URL"))?;
            let pool = MySqlPoolOptions::new()
                .max_connections(config.max_connections)
                .max_lifetime(Duration::from_secs(config.connection_lifetime_secs))
                .connect(url)
                .await?;
            info!("Connected to database");

            if config.run_migrations {
                sqlx::migrate!("./migrations").run(&pool).await?;
                info!("Migrations applied");
            }
            AppState::mysql(pool, config.jwt_secret.clone())
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store: data is lost on shutdown");
            AppState::memory(Arc::new(MemoryStore::new()), config.jwt_secret.clone())
        }
    }
    .with_equipment_sync(config.equipment_sync)
    .with_feed_capacity(config.feed_capacity);

    // Crea il router
    let app = create_router(Arc::new(state));

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        // senza segnale il server resta attivo fino alla terminazione del processo
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
