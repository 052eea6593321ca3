//! tether-plugin-api - Plugin API for the tether sandbox runtime
//!
//! This crate provides the traits and types needed to write a plugin that is
//! hosted inside an isolated tether process. The runtime (`tether-core`)
//! drives the plugin's lifecycle entry points in response to messages from
//! the controlling host and normalizes every failure the plugin reports.
//!
//! # Example
//!
//! ```ignore
//! use async_trait::async_trait;
//! use tether_plugin_api::{Plugin, PluginError, PluginMetadata};
//!
//! pub struct MyPlugin;
//!
//! #[async_trait]
//! impl Plugin for MyPlugin {
//!     fn metadata(&self) -> PluginMetadata {
//!         PluginMetadata::new("my-plugin", "0.1.0")
//!     }
//!
//!     async fn init(&self) -> Result<(), PluginError> {
//!         Ok(())
//!     }
//!
//!     async fn render(&self) -> Result<String, PluginError> {
//!         Ok("<p>Hello</p>".to_string())
//!     }
//! }
//! ```

pub mod error;
pub mod handling;
pub mod storage;
pub mod types;

use async_trait::async_trait;

pub use error::PluginError;
pub use handling::{ErrorHandling, ErrorRenderer};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use types::*;

/// Current plugin API version.
pub const API_VERSION: u32 = 1;

/// The core plugin trait - implement this to build a tether plugin.
///
/// Lifecycle entry points take `&self` because the runtime shares the plugin
/// as `Arc<dyn Plugin>`; plugins keep mutable state behind their own locks.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Return plugin metadata
    fn metadata(&self) -> PluginMetadata;

    /// Called when the host asks the plugin to initialize
    async fn init(&self) -> Result<(), PluginError>;

    /// Produce the plugin's markup
    async fn render(&self) -> Result<String, PluginError>;

    /// Error-reporting hook, used both for logging and host-visible alerting
    fn error(&self, error: &PluginError) {
        tracing::error!(
            plugin = %self.metadata().name,
            error = %error,
            "Plugin reported error"
        );
    }

    /// Error-handling configuration applied when the runtime wraps `method`
    fn error_handling(&self, _method: &str) -> ErrorHandling {
        ErrorHandling::default()
    }

    // ─── Optional capabilities (default: absent) ─────────────────────

    /// Quick actions capability, if this plugin offers one
    fn as_quick_actions(&self) -> Option<&dyn QuickActions> {
        None
    }

    /// Side panel capability, if this plugin offers one
    fn as_side_panel(&self) -> Option<&dyn SidePanel> {
        None
    }
}

/// Optional capability: shortcuts the host can surface for this plugin.
pub trait QuickActions: Send + Sync {
    /// List the quick actions
    fn define_quick_actions(&self) -> Vec<QuickAction>;
}

/// Optional capability: a side panel entry with a submenu.
pub trait SidePanel: Send + Sync {
    /// Describe the side panel
    fn define_side_panel(&self) -> SidePanelConfig;
}
