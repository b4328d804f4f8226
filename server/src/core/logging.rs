//! Inizializzazione del subscriber tracing

use crate::core::config::LogFormat;
use std::io;
use tracing_subscriber::{EnvFilter, fmt};

/// Installa il subscriber globale.
/// - Rispetta `RUST_LOG` se impostata, altrimenti `info,tower_http=info`
/// - Scrive su stdout, in formato compatto oppure JSON
pub fn init_logging(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));
    let builder = fmt().with_env_filter(env_filter).with_writer(io::stdout);

    // try_init: nei test il subscriber può essere già installato
    let _ = match format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
