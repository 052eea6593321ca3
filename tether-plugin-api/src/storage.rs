//! Key/value storage for plugins
//!
//! Plugins consume storage directly; the runtime core never touches it.
//! Two backends are provided: [`MemoryStorage`] for ephemeral state and
//! [`FileStorage`], which persists the whole map as JSON after every write.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::sync::RwLock;

use crate::PluginError;

/// String-keyed store of JSON values
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read a value
    async fn get(&self, key: &str) -> Option<Value>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: Value) -> Result<(), PluginError>;

    /// Remove a value, returns whether it existed
    async fn remove(&self, key: &str) -> Result<bool, PluginError>;

    /// Remove every value
    async fn clear(&self) -> Result<(), PluginError>;

    /// Check whether a key is present
    async fn has(&self, key: &str) -> bool;

    /// List all keys
    async fn keys(&self) -> Vec<String>;
}

/// In-memory storage, lost when the process exits
#[derive(Default)]
pub struct MemoryStorage {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Option<Value> {
        self.values.read().await.get(key).cloned()
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), PluginError> {
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, PluginError> {
        Ok(self.values.write().await.remove(key).is_some())
    }

    async fn clear(&self) -> Result<(), PluginError> {
        self.values.write().await.clear();
        Ok(())
    }

    async fn has(&self, key: &str) -> bool {
        self.values.read().await.contains_key(key)
    }

    async fn keys(&self) -> Vec<String> {
        self.values.read().await.keys().cloned().collect()
    }
}

/// File-backed storage, one JSON object per file
pub struct FileStorage {
    values: Arc<RwLock<HashMap<String, Value>>>,
    file_path: PathBuf,
}

impl FileStorage {
    /// Load storage from file or create an empty store
    ///
    /// The file is only created on the first write.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, PluginError> {
        let file_path = path.as_ref().to_path_buf();

        let values = if fs::try_exists(&file_path).await? {
            let content = fs::read_to_string(&file_path).await?;
            serde_json::from_str(&content).map_err(|e| {
                PluginError::Storage(format!(
                    "failed to parse {}: {}",
                    file_path.display(),
                    e
                ))
            })?
        } else {
            HashMap::new()
        };

        Ok(Self {
            values: Arc::new(RwLock::new(values)),
            file_path,
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Persist values to file
    async fn persist(&self) -> Result<(), PluginError> {
        let values = self.values.read().await;

        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                PluginError::Storage(format!("failed to create storage dir: {}", e))
            })?;
        }

        let content = serde_json::to_string_pretty(&*values)?;

        fs::write(&self.file_path, content)
            .await
            .map_err(|e| PluginError::Storage(format!("failed to write storage: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn get(&self, key: &str) -> Option<Value> {
        self.values.read().await.get(key).cloned()
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), PluginError> {
        {
            let mut values = self.values.write().await;
            values.insert(key.to_string(), value);
        }
        self.persist().await
    }

    async fn remove(&self, key: &str) -> Result<bool, PluginError> {
        let removed = {
            let mut values = self.values.write().await;
            values.remove(key).is_some()
        };
        if removed {
            self.persist().await?;
        }
        Ok(removed)
    }

    async fn clear(&self) -> Result<(), PluginError> {
        {
            let mut values = self.values.write().await;
            values.clear();
        }
        self.persist().await
    }

    async fn has(&self, key: &str) -> bool {
        self.values.read().await.contains_key(key)
    }

    async fn keys(&self) -> Vec<String> {
        self.values.read().await.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn memory_storage_set_get_remove() {
        let storage = MemoryStorage::new();
        storage.set("count", json!(3)).await.unwrap();

        assert_eq!(storage.get("count").await, Some(json!(3)));
        assert!(storage.has("count").await);
        assert!(storage.remove("count").await.unwrap());
        assert!(!storage.remove("count").await.unwrap());
        assert!(storage.get("count").await.is_none());
    }

    #[tokio::test]
    async fn memory_storage_clear_and_keys() {
        let storage = MemoryStorage::new();
        storage.set("a", json!(1)).await.unwrap();
        storage.set("b", json!("two")).await.unwrap();

        let mut keys = storage.keys().await;
        keys.sort();
        assert_eq!(keys, vec!["a", "b"]);

        storage.clear().await.unwrap();
        assert!(storage.keys().await.is_empty());
    }

    #[tokio::test]
    async fn file_storage_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/store.json");

        let storage = FileStorage::open(&path).await.unwrap();
        storage.set("greeting", json!({"name": "ada"})).await.unwrap();
        assert!(path.exists());

        let reopened = FileStorage::open(&path).await.unwrap();
        assert_eq!(
            reopened.get("greeting").await,
            Some(json!({"name": "ada"}))
        );
    }

    #[tokio::test]
    async fn file_storage_missing_file_is_empty_and_not_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");

        let storage = FileStorage::open(&path).await.unwrap();
        assert!(storage.keys().await.is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn file_storage_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();

        let result = FileStorage::open(&path).await;
        assert!(matches!(result, Err(PluginError::Storage(_))));
    }

    #[tokio::test]
    async fn file_storage_remove_and_clear_persist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");

        let storage = FileStorage::open(&path).await.unwrap();
        storage.set("a", json!(1)).await.unwrap();
        storage.set("b", json!(2)).await.unwrap();
        storage.remove("a").await.unwrap();

        let reopened = FileStorage::open(&path).await.unwrap();
        assert!(!reopened.has("a").await);
        assert!(reopened.has("b").await);

        reopened.clear().await.unwrap();
        let cleared = FileStorage::open(&path).await.unwrap();
        assert!(cleared.keys().await.is_empty());
    }
}
