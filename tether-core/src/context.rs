//! Process-wide runtime state
//!
//! One [`RuntimeContext`] is built at process start and handed to everything
//! that needs the notification log or the registry. [`RuntimeContext::shutdown`]
//! is the explicit teardown.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use crate::communicator::{Communicator, OutboundEnvelope};
use crate::config::RuntimeConfig;
use crate::notifications::NotificationLog;
use crate::registry::PluginRegistry;

pub struct RuntimeContext {
    config: RuntimeConfig,
    notifications: Arc<NotificationLog>,
    registry: Arc<PluginRegistry>,
}

impl RuntimeContext {
    pub fn new(config: RuntimeConfig) -> Self {
        let notifications = Arc::new(NotificationLog::new(config.notifications.capacity));
        let registry = Arc::new(PluginRegistry::new(Arc::clone(&notifications)));
        Self {
            config,
            notifications,
            registry,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn notifications(&self) -> &Arc<NotificationLog> {
        &self.notifications
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Communicator answering the protocol tags from this context's registry
    pub fn communicator(&self, outbound: mpsc::Sender<OutboundEnvelope>) -> Communicator {
        Communicator::with_registry(Arc::clone(&self.registry), outbound)
    }

    /// Drop the plugin, its handlers and all notifications
    pub fn shutdown(&self) {
        self.registry.clear_all_handlers();
        self.registry.clear_plugin();
        self.notifications.clear_notifications();
        info!("Runtime context shut down");
    }
}

impl Default for RuntimeContext {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}
