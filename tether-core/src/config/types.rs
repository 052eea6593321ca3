use std::num::NonZeroUsize;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::notifications::DEFAULT_CAPACITY;

/// Default tracing filter
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawRuntimeConfig {
    #[serde(default)]
    pub notifications: RawNotificationsConfig,

    #[serde(default)]
    pub logging: RawLoggingConfig,

    #[serde(default)]
    pub storage: RawStorageConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawNotificationsConfig {
    /// Notification log capacity; zero is rejected when finalizing
    pub capacity: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawLoggingConfig {
    pub level: Option<String>,
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawStorageConfig {
    pub backend: Option<StorageBackend>,
    pub dir: Option<PathBuf>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub notifications: NotificationsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationsConfig {
    /// Maximum notifications kept before the oldest is evicted
    pub capacity: NonZeroUsize,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,

    /// Append logs to this file instead of stderr
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

/// Where plugins keep their key/value state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Directory for file storage; defaults to the tether data directory
    pub dir: Option<PathBuf>,
}

impl StorageConfig {
    /// File backing `plugin_name` when the file backend is selected
    pub fn file_for(&self, plugin_name: &str) -> PathBuf {
        match &self.dir {
            Some(dir) => dir.join(format!("{plugin_name}.json")),
            None => tether_paths::storage_file(plugin_name),
        }
    }
}
