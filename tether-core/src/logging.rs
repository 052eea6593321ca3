//! Tracing subscriber setup for plugin processes
//!
//! Stdout carries the protocol, so logs go to stderr or to the file named
//! by `[logging] file`. `RUST_LOG` takes precedence over the configured
//! level.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{Registry, fmt};

use crate::config::LoggingConfig;

/// Level used by `--verbose`
pub const VERBOSE_LEVEL: &str = "debug";

/// Error type for logging initialization.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),

    #[error("failed to open log file {}: {source}", path.display())]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to set global subscriber: {0}")]
    SetGlobalSubscriber(#[from] TryInitError),
}

/// Filter directive for `config`, raised to debug when `verbose`
pub fn filter_directive(config: &LoggingConfig, verbose: bool) -> &str {
    if verbose {
        VERBOSE_LEVEL
    } else {
        config.level.as_str()
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails on an invalid level, an unwritable log file, or when a global
/// subscriber is already set.
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(filter_directive(config, verbose))?,
    };

    match &config.file {
        Some(path) => {
            let file = open_log_file(path)?;
            Registry::default()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()?;
        }
        None => {
            Registry::default()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init()?;
        }
    }

    Ok(())
}

/// Open `path` for appending, creating parent directories
fn open_log_file(path: &Path) -> Result<File, LoggingError> {
    let open_error = |source: std::io::Error| LoggingError::OpenFile {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(open_error)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(open_error)
}
