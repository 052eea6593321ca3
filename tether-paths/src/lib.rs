//! XDG Base Directory paths for tether.
//!
//! The sandbox runtime uses XDG paths on every platform so a plugin process
//! finds its configuration and storage in the same place regardless of OS.

use std::path::PathBuf;

/// Get the tether config directory.
///
/// Returns `$XDG_CONFIG_HOME/tether` if set, otherwise `~/.config/tether`.
///
/// # Examples
///
/// ```
/// use tether_paths::config_dir;
///
/// let config_file = config_dir().join("config.toml");
/// ```
pub fn config_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config).join("tether")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".config/tether")
    } else {
        PathBuf::from(".config/tether")
    }
}

/// Get the tether data directory.
///
/// Returns `$XDG_DATA_HOME/tether` if set, otherwise `~/.local/share/tether`.
pub fn data_dir() -> PathBuf {
    if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg_data).join("tether")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".local/share/tether")
    } else {
        PathBuf::from(".local/share/tether")
    }
}

/// Default file-backed storage location for a plugin.
///
/// # Examples
///
/// ```
/// use tether_paths::storage_file;
///
/// assert!(storage_file("hello").ends_with("storage/hello.json"));
/// ```
pub fn storage_file(plugin_name: &str) -> PathBuf {
    data_dir().join("storage").join(format!("{plugin_name}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_config_dir_ends_with_tether() {
        let path = config_dir();
        assert!(
            path.ends_with("tether"),
            "config_dir should end with 'tether'"
        );
    }

    #[test]
    #[serial]
    fn test_config_dir_respects_xdg_env() {
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", "/tmp/test-config");
        }
        let path = config_dir();
        assert_eq!(path, PathBuf::from("/tmp/test-config/tether"));
        unsafe {
            std::env::remove_var("XDG_CONFIG_HOME");
        }
    }

    #[test]
    #[serial]
    fn test_storage_file_lives_under_data_dir() {
        unsafe {
            std::env::set_var("XDG_DATA_HOME", "/tmp/test-data");
        }
        let path = storage_file("hello");
        assert_eq!(path, PathBuf::from("/tmp/test-data/tether/storage/hello.json"));
        unsafe {
            std::env::remove_var("XDG_DATA_HOME");
        }
    }
}
