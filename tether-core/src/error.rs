//! Error types for tether-core

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while moving envelopes over the channel
#[derive(Error, Debug)]
pub enum CommunicatorError {
    #[error("Channel I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize envelope: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Outbound channel closed")]
    ChannelClosed,

    #[error("Writer task panicked")]
    WriterPanicked,
}

/// Errors related to the plugin registry
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("No plugin registered; cannot {operation}")]
    NoPlugin { operation: String },
}

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_plugin_names_operation() {
        let err = RegistryError::NoPlugin {
            operation: "register guarded handler 'greet'".into(),
        };
        assert_eq!(
            err.to_string(),
            "No plugin registered; cannot register guarded handler 'greet'"
        );
    }

    #[test]
    fn read_error_includes_path() {
        let err = ConfigError::Read {
            path: PathBuf::from("/etc/tether.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("/etc/tether.toml"));
    }
}
