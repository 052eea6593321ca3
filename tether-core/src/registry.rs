//! Plugin and handler registry
//!
//! The [`PluginRegistry`] holds the single plugin served by this process and
//! a table of named handlers that answer UI messages. The plugin's `init`
//! and `render` entry points are wrapped with [`with_error_handling`] once,
//! when the plugin is registered.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tether_plugin_api::{ErrorHandling, Plugin, PluginError, QuickAction, SidePanelConfig};
use tracing::{debug, error, info, warn};

use crate::error::RegistryError;
use crate::guard::{GuardScope, GuardedMethod, INIT_METHOD, RENDER_METHOD, with_error_handling};
use crate::notifications::NotificationLog;

/// Boxed future returned by handlers
pub type HandlerFuture = Pin<Box<dyn Future<Output = Value> + Send>>;

/// A named callback answering UI messages
pub type Handler = Arc<dyn Fn(Value) -> HandlerFuture + Send + Sync>;

/// The plugin currently served, with its wrapped lifecycle entry points
#[derive(Clone)]
struct ActivePlugin {
    instance: Arc<dyn Plugin>,
    init: GuardedMethod,
    render: GuardedMethod,
}

/// Registry of the active plugin and its handlers
pub struct PluginRegistry {
    plugin: Arc<RwLock<Option<ActivePlugin>>>,
    handlers: RwLock<HashMap<String, Handler>>,
    notifications: Arc<NotificationLog>,
}

impl PluginRegistry {
    /// Create an empty registry reporting failures to `notifications`
    pub fn new(notifications: Arc<NotificationLog>) -> Self {
        Self {
            plugin: Arc::new(RwLock::new(None)),
            handlers: RwLock::new(HashMap::new()),
            notifications,
        }
    }

    // ─── Plugin ──────────────────────────────────────────────────────

    /// Make `plugin` the active plugin, replacing any previous one
    pub fn register_plugin(&self, plugin: Arc<dyn Plugin>) {
        let metadata = plugin.metadata();
        let scope = self.scope_for(&plugin);

        let init = {
            let config = plugin.error_handling(INIT_METHOD);
            let plugin = Arc::clone(&plugin);
            with_error_handling(
                INIT_METHOD,
                move |_args| {
                    let plugin = Arc::clone(&plugin);
                    async move { plugin.init().await.map(|()| Value::Null) }
                },
                config,
                scope.clone(),
            )
        };

        let render = {
            let config = plugin.error_handling(RENDER_METHOD);
            let plugin = Arc::clone(&plugin);
            with_error_handling(
                RENDER_METHOD,
                move |_args| {
                    let plugin = Arc::clone(&plugin);
                    async move { plugin.render().await.map(Value::String) }
                },
                config,
                scope,
            )
        };

        let previous = self
            .plugin
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(ActivePlugin {
                instance: plugin,
                init,
                render,
            });

        if let Some(previous) = previous {
            debug!(plugin = %previous.instance.metadata().name, "Replacing active plugin");
        }
        info!(
            plugin = %metadata.name,
            version = %metadata.version,
            "Plugin registered"
        );
    }

    /// Unset the active plugin
    pub fn clear_plugin(&self) {
        let previous = self
            .plugin
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(previous) = previous {
            info!(plugin = %previous.instance.metadata().name, "Plugin cleared");
        }
    }

    /// The active plugin, if any
    pub fn active_plugin(&self) -> Option<Arc<dyn Plugin>> {
        self.active().map(|active| active.instance)
    }

    /// Check whether a plugin is registered
    pub fn has_plugin(&self) -> bool {
        self.plugin
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn active(&self) -> Option<ActivePlugin> {
        self.plugin
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn scope_for(&self, plugin: &Arc<dyn Plugin>) -> GuardScope {
        GuardScope::new(Arc::clone(&self.notifications), Arc::clone(plugin))
    }

    // ─── Handlers ────────────────────────────────────────────────────

    /// Register a handler, replacing any handler with the same name
    pub fn register_handler<F, Fut>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Value> + Send + 'static,
    {
        let name = name.into();
        let handler: Handler = Arc::new(move |data| -> HandlerFuture { Box::pin(handler(data)) });

        let replaced = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), handler)
            .is_some();

        if replaced {
            debug!(handler = %name, "Handler replaced");
        } else {
            debug!(handler = %name, "Handler registered");
        }
    }

    /// Register a handler whose failures are normalized by
    /// [`with_error_handling`] and reported to the active plugin.
    ///
    /// The reporter is looked up on every call, so a plugin registered
    /// later receives the failures. With no active plugin the one present
    /// at registration still reports.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NoPlugin`] when no plugin is registered.
    pub fn register_guarded_handler<F, Fut>(
        &self,
        name: impl Into<String>,
        handler: F,
        config: ErrorHandling,
    ) -> Result<(), RegistryError>
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, PluginError>> + Send + 'static,
    {
        let name = name.into();
        let plugin = self.active_plugin().ok_or_else(|| RegistryError::NoPlugin {
            operation: format!("register guarded handler '{name}'"),
        })?;

        let guarded = with_error_handling(name.clone(), handler, config, self.scope_for(&plugin));
        let active = Arc::clone(&self.plugin);
        self.register_handler(name, move |data| {
            let reporter = active
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .as_ref()
                .map(|current| Arc::clone(&current.instance));
            let guarded = match reporter {
                Some(reporter) => guarded.with_reporter(reporter),
                None => guarded.clone(),
            };
            async move {
                match guarded.call(data).await {
                    Ok(value) => value,
                    Err(e) => {
                        error!(handler = %guarded.method(), error = %e, "Guarded handler re-raised");
                        Value::Null
                    }
                }
            }
        });
        Ok(())
    }

    /// Remove one handler, returns whether it existed
    pub fn clear_handler(&self, name: &str) -> bool {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some()
    }

    /// Remove every handler
    pub fn clear_all_handlers(&self) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Check whether a handler is registered
    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Names of all registered handlers
    pub fn handler_names(&self) -> Vec<String> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Invoke a handler by name.
    ///
    /// Unknown handlers are answered with `null` and a warning naming the
    /// handler.
    pub async fn call_handler(&self, name: &str, data: Value) -> Value {
        let handler = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();

        match handler {
            Some(handler) => handler(data).await,
            None => {
                warn!(handler = %name, "No handler registered");
                Value::Null
            }
        }
    }

    // ─── Lifecycle ───────────────────────────────────────────────────

    /// Run the active plugin's wrapped `init`.
    ///
    /// Returns `None` when no plugin is registered.
    pub async fn call_init(&self) -> Option<Result<Value, PluginError>> {
        let Some(active) = self.active() else {
            warn!("init requested but no plugin is registered");
            return None;
        };
        Some(active.init.call(Value::Array(Vec::new())).await)
    }

    /// Run the active plugin's wrapped `render`.
    ///
    /// Returns `None` when no plugin is registered.
    pub async fn call_renderer(&self) -> Option<Result<Value, PluginError>> {
        let Some(active) = self.active() else {
            warn!("render requested but no plugin is registered");
            return None;
        };
        Some(active.render.call(Value::Array(Vec::new())).await)
    }

    // ─── Capabilities ────────────────────────────────────────────────

    /// Quick actions of the active plugin, empty when absent
    pub fn quick_actions(&self) -> Vec<QuickAction> {
        self.active_plugin()
            .and_then(|plugin| {
                plugin
                    .as_quick_actions()
                    .map(|actions| actions.define_quick_actions())
            })
            .unwrap_or_default()
    }

    /// Side panel of the active plugin, `None` when absent
    pub fn side_panel_config(&self) -> Option<SidePanelConfig> {
        self.active_plugin()
            .and_then(|plugin| plugin.as_side_panel().map(|panel| panel.define_side_panel()))
    }
}
