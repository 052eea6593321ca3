use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::types::{
    LoggingConfig, NotificationsConfig, RawLoggingConfig, RawNotificationsConfig,
    RawRuntimeConfig, RawStorageConfig, RuntimeConfig, StorageConfig, DEFAULT_LOG_LEVEL,
};
use crate::error::ConfigError;
use crate::notifications::DEFAULT_CAPACITY;

/// Env var overriding the project config directory
pub const PROJECT_CONFIG_DIR_ENV: &str = "TETHER_PROJECT_CONFIG_DIR";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user, then project, then `explicit`)
    ///
    /// The user and project files are optional; an explicit path must exist.
    pub fn load(explicit: Option<&Path>) -> Result<RuntimeConfig, ConfigError> {
        let mut raw = RawRuntimeConfig::default();

        // Layer 1: User config
        let user_path = Self::user_config_path();
        if user_path.exists() {
            raw = Self::merge_raw(raw, Self::read_raw(&user_path)?);
        }

        // Layer 2: Project config
        let project_path = Self::project_config_path();
        if project_path.exists() {
            raw = Self::merge_raw(raw, Self::read_raw(&project_path)?);
        }

        // Layer 3: Explicit --config
        if let Some(path) = explicit {
            raw = Self::merge_raw(raw, Self::read_raw(path)?);
        }

        Self::finalize(raw)
    }

    /// Load a single file with defaults applied, ignoring other layers
    pub fn load_from_path(path: &Path) -> Result<RuntimeConfig, ConfigError> {
        Self::finalize(Self::read_raw(path)?)
    }

    /// Get user config path
    pub fn user_config_path() -> PathBuf {
        tether_paths::config_dir().join("config.toml")
    }

    /// Get project config path
    /// Can be overridden with TETHER_PROJECT_CONFIG_DIR (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var(PROJECT_CONFIG_DIR_ENV) {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".tether/config.toml")
        }
    }

    fn read_raw(path: &Path) -> Result<RawRuntimeConfig, ConfigError> {
        debug!(path = %path.display(), "Reading config layer");
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawRuntimeConfig, overlay: RawRuntimeConfig) -> RawRuntimeConfig {
        RawRuntimeConfig {
            notifications: RawNotificationsConfig {
                capacity: overlay.notifications.capacity.or(base.notifications.capacity),
            },
            logging: RawLoggingConfig {
                level: overlay.logging.level.or(base.logging.level),
                file: overlay.logging.file.or(base.logging.file),
            },
            storage: RawStorageConfig {
                backend: overlay.storage.backend.or(base.storage.backend),
                dir: overlay.storage.dir.or(base.storage.dir),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawRuntimeConfig) -> Result<RuntimeConfig, ConfigError> {
        let capacity = match raw.notifications.capacity {
            Some(capacity) => NonZeroUsize::new(capacity).ok_or_else(|| {
                ConfigError::Invalid("notifications.capacity must be at least 1".to_string())
            })?,
            None => DEFAULT_CAPACITY,
        };

        Ok(RuntimeConfig {
            notifications: NotificationsConfig { capacity },
            logging: LoggingConfig {
                level: raw
                    .logging
                    .level
                    .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
                file: raw.logging.file,
            },
            storage: StorageConfig {
                backend: raw.storage.backend.unwrap_or_default(),
                dir: raw.storage.dir,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageBackend;
    use serial_test::serial;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// Point the user and project layers at `dir` for the duration of a test
    fn isolate(dir: &TempDir) {
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", dir.path().join("xdg"));
            std::env::set_var(PROJECT_CONFIG_DIR_ENV, dir.path().join("project"));
        }
    }

    fn restore() {
        unsafe {
            std::env::remove_var("XDG_CONFIG_HOME");
            std::env::remove_var(PROJECT_CONFIG_DIR_ENV);
        }
    }

    #[test]
    fn test_merge_overlay_wins_when_set() {
        let base = RawRuntimeConfig {
            notifications: RawNotificationsConfig { capacity: Some(10) },
            logging: RawLoggingConfig {
                level: Some("debug".into()),
                file: None,
            },
            ..Default::default()
        };
        let overlay = RawRuntimeConfig {
            notifications: RawNotificationsConfig { capacity: Some(20) },
            ..Default::default()
        };

        let merged = ConfigLoader::merge_raw(base, overlay);
        assert_eq!(merged.notifications.capacity, Some(20));
        assert_eq!(merged.logging.level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_finalize_rejects_zero_capacity() {
        let raw = RawRuntimeConfig {
            notifications: RawNotificationsConfig { capacity: Some(0) },
            ..Default::default()
        };
        let result = ConfigLoader::finalize(raw);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_from_path_applies_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "tether.toml", "[logging]\nlevel = \"warn\"\n");

        let config = ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.notifications.capacity, DEFAULT_CAPACITY);
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "broken.toml", "[notifications\ncapacity = ");

        let err = ConfigLoader::load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    #[serial]
    fn test_load_without_files_uses_defaults() {
        let dir = TempDir::new().unwrap();
        isolate(&dir);

        let config = ConfigLoader::load(None).unwrap();
        restore();

        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    #[serial]
    fn test_layers_override_in_order() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "xdg/tether/config.toml",
            "[notifications]\ncapacity = 10\n[logging]\nlevel = \"debug\"\n",
        );
        write(
            &dir,
            "project/config.toml",
            "[notifications]\ncapacity = 20\n[storage]\nbackend = \"file\"\n",
        );
        let explicit = write(&dir, "cli.toml", "[notifications]\ncapacity = 30\n");
        isolate(&dir);

        let project_only = ConfigLoader::load(None).unwrap();
        let with_explicit = ConfigLoader::load(Some(&explicit)).unwrap();
        restore();

        assert_eq!(project_only.notifications.capacity.get(), 20);
        assert_eq!(project_only.logging.level, "debug");
        assert_eq!(project_only.storage.backend, StorageBackend::File);
        assert_eq!(with_explicit.notifications.capacity.get(), 30);
        assert_eq!(with_explicit.logging.level, "debug");
    }

    #[test]
    #[serial]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        isolate(&dir);

        let result = ConfigLoader::load(Some(&dir.path().join("absent.toml")));
        restore();

        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
