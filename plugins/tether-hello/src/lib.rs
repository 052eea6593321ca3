//! Hello Plugin - A simple example plugin for tether
//!
//! This plugin demonstrates:
//! - Implementing the `Plugin` trait with both optional capabilities
//! - Guarded handlers whose failures come back as structured errors
//! - Keeping state across messages in plugin storage
//!
//! ## Running
//!
//! ```bash
//! echo '{"message":"PLUGIN_READY"}' | tether-hello --verbose
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tether_core::config::{StorageBackend, StorageConfig};
use tether_core::{DEFAULT_HANDLER, RENDER_METHOD, RegistryError, RuntimeContext};
use tether_plugin_api::{
    ErrorHandling, FileStorage, MemoryStorage, Plugin, PluginError, PluginMetadata, QuickAction,
    QuickActions, SidePanel, SidePanelConfig, Storage, SubmenuItem,
};
use tracing::{debug, info};

/// Plugin name, also used for its storage file
pub const PLUGIN_NAME: &str = "hello";

/// Storage key counting greetings
const GREETINGS_KEY: &str = "greetings";

/// Greets people and remembers how many it has greeted.
pub struct HelloPlugin {
    storage: Arc<dyn Storage>,
}

impl HelloPlugin {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Number of greetings sent so far
    pub async fn greeting_count(&self) -> u64 {
        self.storage
            .get(GREETINGS_KEY)
            .await
            .and_then(|count| count.as_u64())
            .unwrap_or(0)
    }

    /// Greet `{"name": ...}` (or a bare string) and bump the counter
    pub async fn greet(&self, content: Value) -> Result<Value, PluginError> {
        let name = match &content {
            Value::String(name) => name.as_str(),
            Value::Object(fields) => fields.get("name").and_then(Value::as_str).unwrap_or(""),
            _ => "",
        }
        .trim();

        if name.is_empty() {
            return Err(PluginError::invalid_input("name must not be empty"));
        }

        let count = self.greeting_count().await + 1;
        self.storage.set(GREETINGS_KEY, json!(count)).await?;
        debug!(name = %name, count, "Greeted");

        Ok(json!({
            "message": format!("Hello, {name}!"),
            "count": count,
        }))
    }
}

#[async_trait]
impl Plugin for HelloPlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new(PLUGIN_NAME, env!("CARGO_PKG_VERSION"))
            .with_author("tether-team")
            .with_description("A simple example plugin that greets people")
            .with_icon("wave")
    }

    async fn init(&self) -> Result<(), PluginError> {
        let greetings = self.greeting_count().await;
        info!(greetings, "Hello plugin initialized");
        Ok(())
    }

    async fn render(&self) -> Result<String, PluginError> {
        let count = self.greeting_count().await;
        Ok(format!(
            "<div class=\"hello\"><h2>Hello from tether</h2><p>Greetings sent: {count}</p></div>"
        ))
    }

    fn error_handling(&self, method: &str) -> ErrorHandling {
        if method == RENDER_METHOD {
            ErrorHandling::new().with_context(json!({ "plugin": PLUGIN_NAME }))
        } else {
            ErrorHandling::new()
        }
    }

    fn as_quick_actions(&self) -> Option<&dyn QuickActions> {
        Some(self)
    }

    fn as_side_panel(&self) -> Option<&dyn SidePanel> {
        Some(self)
    }
}

impl QuickActions for HelloPlugin {
    fn define_quick_actions(&self) -> Vec<QuickAction> {
        vec![
            QuickAction {
                name: "Say hello".to_string(),
                message_type: "greet".to_string(),
                subtitle: Some("Greet someone by name".to_string()),
                icon: Some("wave".to_string()),
            },
            QuickAction::new("Recent notifications", "notifications"),
        ]
    }
}

impl SidePanel for HelloPlugin {
    fn define_side_panel(&self) -> SidePanelConfig {
        SidePanelConfig {
            icon: "wave".to_string(),
            label: "Hello".to_string(),
            submenu_list: vec![SubmenuItem {
                id: "notifications".to_string(),
                name: "Notifications".to_string(),
                message_type: "notifications".to_string(),
            }],
        }
    }
}

/// Open the storage backend selected by `config`
pub async fn open_storage(config: &StorageConfig) -> Result<Arc<dyn Storage>, PluginError> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStorage::new())),
        StorageBackend::File => {
            let path = config.file_for(PLUGIN_NAME);
            debug!(path = %path.display(), "Opening file storage");
            Ok(Arc::new(FileStorage::open(path).await?))
        }
    }
}

/// Register `plugin` and its handlers with `context`
pub fn install(context: &RuntimeContext, plugin: Arc<HelloPlugin>) -> Result<(), RegistryError> {
    let registry = context.registry();
    registry.register_plugin(plugin.clone());

    registry.register_handler(DEFAULT_HANDLER, |data| async move { data });

    registry.register_guarded_handler(
        "greet",
        move |data| {
            let plugin = Arc::clone(&plugin);
            async move { plugin.greet(data).await }
        },
        ErrorHandling::new().with_context(json!({ "handler": "greet" })),
    )?;

    let notifications = Arc::clone(context.notifications());
    registry.register_handler("notifications", move |_| {
        let snapshot = notifications.notifications();
        async move { serde_json::to_value(snapshot).unwrap_or(Value::Null) }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn plugin() -> HelloPlugin {
        HelloPlugin::new(Arc::new(MemoryStorage::new()))
    }

    #[tokio::test]
    async fn greet_counts_in_storage() {
        let plugin = plugin();
        let first = plugin.greet(json!({"name": "Ada"})).await.unwrap();
        let second = plugin.greet(json!("Grace")).await.unwrap();

        assert_eq!(first["message"], "Hello, Ada!");
        assert_eq!(second["count"], 2);
        assert_eq!(plugin.greeting_count().await, 2);
    }

    #[tokio::test]
    async fn greet_rejects_empty_name() {
        let plugin = plugin();
        let result = plugin.greet(json!({"name": "   "})).await;
        assert!(matches!(result, Err(PluginError::InvalidInput(_))));
        assert_eq!(plugin.greeting_count().await, 0);
    }

    #[tokio::test]
    async fn render_shows_count() {
        let plugin = plugin();
        plugin.greet(json!("Ada")).await.unwrap();
        assert!(plugin.render().await.unwrap().contains("Greetings sent: 1"));
    }

    #[test]
    fn exposes_both_capabilities() {
        let plugin = plugin();
        assert_eq!(plugin.as_quick_actions().unwrap().define_quick_actions().len(), 2);
        assert_eq!(plugin.as_side_panel().unwrap().define_side_panel().label, "Hello");
    }

    #[tokio::test]
    async fn file_storage_survives_restart() {
        let dir = TempDir::new().unwrap();
        let config = StorageConfig {
            backend: StorageBackend::File,
            dir: Some(dir.path().to_path_buf()),
        };

        let plugin = HelloPlugin::new(open_storage(&config).await.unwrap());
        plugin.greet(json!("Ada")).await.unwrap();

        let restarted = HelloPlugin::new(open_storage(&config).await.unwrap());
        assert_eq!(restarted.greeting_count().await, 1);
        assert!(dir.path().join("hello.json").exists());
    }

    #[tokio::test]
    async fn install_registers_handlers() {
        let context = RuntimeContext::default();
        install(&context, Arc::new(plugin())).unwrap();

        let registry = context.registry();
        assert!(registry.has_plugin());
        assert_eq!(registry.call_handler(DEFAULT_HANDLER, json!(1)).await, json!(1));

        let ok = registry.call_handler("greet", json!({"name": "Ada"})).await;
        assert_eq!(ok["success"], true);
        assert_eq!(ok["result"]["count"], 1);

        let failed = registry.call_handler("greet", json!({})).await;
        assert_eq!(failed["success"], false);

        let notifications = registry.call_handler("notifications", Value::Null).await;
        assert_eq!(notifications.as_array().unwrap().len(), 1);
        assert_eq!(notifications[0]["level"], "error");
    }
}
