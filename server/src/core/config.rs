//! Configurazione dell'applicazione letta dalle variabili d'ambiente

use dotenv::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

const INSECURE_DEFAULT_SECRET: &str = "un segreto meno bello";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in .env file")]
    Missing(&'static str),

    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: &'static str },
}

/// Backend di persistenza selezionato con `STORE_BACKEND`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    MySql,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" => Ok(StoreBackend::MySql),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(ConfigError::Invalid {
                name: "STORE_BACKEND",
                reason: "must be `mysql` or `memory`",
            }),
        }
    }
}

/// Formato dei log selezionato con `LOG_FORMAT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Politica di retry per la scrittura secondaria (disponibilità dell'attrezzatura)
#[derive(Debug, Clone, Copy)]
pub struct SyncRetryPolicy {
    /// Numero di ritentativi dopo il primo fallimento
    pub attempts: usize,
    pub min_backoff: Duration,
}

impl Default for SyncRetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            min_backoff: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub run_migrations: bool,
    pub jwt_secret: String,
    pub server_host: String,
    pub server_port: u16,
    pub max_connections: u32,
    pub connection_lifetime_secs: u64,
    pub app_env: String,
    pub log_format: LogFormat,
    pub equipment_sync: SyncRetryPolicy,
    pub feed_capacity: usize,
}

impl Config {
    /// Carica la configurazione dalle variabili d'ambiente
    /// Chiama dotenv() automaticamente
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let store_backend = env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "mysql".to_string())
            .parse::<StoreBackend>()?;

        let database_url = env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::MySql && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let run_migrations = parse_var("RUN_MIGRATIONS", true, "must be true or false")?;

        // il warning sul segreto di default lo emette print_info, a logging inizializzato
        let jwt_secret =
            env::var("JWT_SECRET").unwrap_or_else(|_| INSECURE_DEFAULT_SECRET.to_string());

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let server_port = parse_var(
            "SERVER_PORT",
            3000u16,
            "must be a number between 0-65535",
        )?;

        let max_connections = parse_var("MAX_DB_CONNECTIONS", 20u32, "must be a positive number")?;

        let connection_lifetime_secs = parse_var(
            "DB_CONNECTION_LIFETIME_SECS",
            1800u64,
            "must be a positive number",
        )?;

        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let log_format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("compact") | Err(_) => LogFormat::Compact,
            Ok(_) => {
                return Err(ConfigError::Invalid {
                    name: "LOG_FORMAT",
                    reason: "must be `compact` or `json`",
                });
            }
        };

        let equipment_sync = SyncRetryPolicy {
            attempts: parse_var("EQUIPMENT_SYNC_ATTEMPTS", 3usize, "must be a positive number")?,
            min_backoff: Duration::from_millis(parse_var(
                "EQUIPMENT_SYNC_BACKOFF_MS",
                50u64,
                "must be a number of milliseconds",
            )?),
        };

        let feed_capacity = parse_var("FEED_CAPACITY", 1024usize, "must be a positive number")?;
        if feed_capacity == 0 {
            return Err(ConfigError::Invalid {
                name: "FEED_CAPACITY",
                reason: "must be greater than zero",
            });
        }

        Ok(Config {
            store_backend,
            database_url,
            run_migrations,
            jwt_secret,
            server_host,
            server_port,
            max_connections,
            connection_lifetime_secs,
            app_env,
            log_format,
            equipment_sync,
            feed_capacity,
        })
    }

    /// Logga la configurazione (nascondendo i segreti)
    pub fn print_info(&self) {
        info!("Server Configuration:");
        info!("   Environment: {}", self.app_env);
        info!("   Server Address: {}:{}", self.server_host, self.server_port);
        info!("   Store backend: {:?}", self.store_backend);
        if let Some(url) = &self.database_url {
            info!("   Database: {}", Self::mask_url(url));
            info!("   Max DB Connections: {}", self.max_connections);
            info!("   Connection Lifetime: {}s", self.connection_lifetime_secs);
        }
        info!(
            "   Equipment sync: {} retries, {}ms min backoff",
            self.equipment_sync.attempts,
            self.equipment_sync.min_backoff.as_millis()
        );
        if self.jwt_secret == INSECURE_DEFAULT_SECRET {
            warn!("   JWT Secret: USING DEFAULT (INSECURE!)");
        } else {
            info!("   JWT Secret: custom secret configured");
        }
    }

    /// Maschera le credenziali dell'URL del database per il logging
    fn mask_url(url: &str) -> String {
        if let (Some(at_pos), Some(scheme_end)) = (url.find('@'), url.find("://")) {
            let scheme = &url[..scheme_end + 3];
            let after_at = &url[at_pos..];
            return format!("{}***{}", scheme, after_at);
        }
        "***".to_string()
    }
}

fn parse_var<T: FromStr>(
    name: &'static str,
    default: T,
    reason: &'static str,
) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { name, reason }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_credentials_in_database_url() {
        assert_eq!(
            Config::mask_url("mysql://root:hunter2@db:3306/marketplace"),
            "mysql://***@db:3306/marketplace"
        );
        assert_eq!(Config::mask_url("not a url"), "***");
    }

    #[test]
    fn store_backend_is_case_insensitive() {
        assert_eq!("MySQL".parse::<StoreBackend>().unwrap(), StoreBackend::MySql);
        assert_eq!("memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("postgres".parse::<StoreBackend>().is_err());
    }
}
