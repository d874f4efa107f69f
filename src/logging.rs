//! Tracing subscriber setup
//!
//! Records log through `tracing`; nothing is printed unless the host
//! application installs a subscriber. `init_tracing` installs the standard
//! one: an `EnvFilter` from the configured level, compact or JSON lines, on
//! stderr or appended to a file through a non-blocking writer.
//!
//! `ROWRECORD_LOG_LEVEL` and `ROWRECORD_LOG_JSON` override the config values.

use std::env;
use std::fs::OpenOptions;
use std::io;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber. A second call leaves the first in place.
pub fn init_tracing(config: &LoggingConfig) -> io::Result<()> {
    let json = env::var("ROWRECORD_LOG_JSON")
        .ok()
        .map_or_else(|| config.is_json(), |v| v != "0");

    let level = env::var("ROWRECORD_LOG_LEVEL").unwrap_or_else(|_| config.level.clone());
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));

    let (writer, guard) = match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_appender::non_blocking(file)
        }
        None => tracing_appender::non_blocking(io::stderr()),
    };

    let base = || {
        tracing_subscriber::fmt()
            .with_env_filter(filter.clone())
            .with_ansi(config.file.is_none())
            .with_target(true)
            .with_writer(writer.clone())
    };

    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = if json {
        Box::new(base().json().finish())
    } else {
        Box::new(base().compact().finish())
    };

    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        let _ = LOG_GUARD.set(guard);
    }
    Ok(())
}
