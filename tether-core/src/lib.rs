//! tether-core: sandbox runtime hosting one plugin per process
//!
//! This crate provides the pieces a plugin process needs to talk to its host:
//!
//! - **Ring buffer** - [`RingBuffer`] fixed-capacity FIFO with oldest-eviction
//! - **Notification log** - [`NotificationLog`] bounded history of diagnostic events
//! - **Error handling** - [`with_error_handling`] normalizes plugin failures
//! - **Registry** - [`PluginRegistry`] for the active plugin and named handlers
//! - **Communicator** - [`Communicator`] routes protocol envelopes to reactions
//!
//! # Quick Start
//!
//! ```no_run
//! use tether_core::{RuntimeContext, serve};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let context = RuntimeContext::default();
//!     context
//!         .registry()
//!         .register_handler("defaultHandler", |data| async move { data });
//!
//!     serve(&context, CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    RuntimeContext                    │
//! │  ┌──────────────┐   ┌─────────────────────────────┐  │
//! │  │ Communicator │──▶│ PluginRegistry              │  │
//! │  │  (reactions) │   │  init/render (guarded)      │  │
//! │  └──────────────┘   │  handlers                   │  │
//! │                     └──────────────┬──────────────┘  │
//! │                                    ▼                 │
//! │                     ┌─────────────────────────────┐  │
//! │                     │ NotificationLog (RingBuffer)│  │
//! │                     └─────────────────────────────┘  │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod buffer;
pub mod communicator;
pub mod config;
pub mod context;
pub mod error;
pub mod guard;
pub mod logging;
pub mod notifications;
pub mod registry;
pub mod runtime;

// Re-export key types for convenience
pub use buffer::RingBuffer;
pub use communicator::{
    Communicator, DEFAULT_HANDLER, InboundEnvelope, OutboundEnvelope, PLUGIN_INIT, PLUGIN_READY,
    PLUGIN_RENDER, UI_MESSAGE, outbound_channel, write_outbound,
};
pub use config::{ConfigLoader, RuntimeConfig, StorageBackend};
pub use context::RuntimeContext;
pub use error::{CommunicatorError, ConfigError, RegistryError};
pub use guard::{GuardScope, GuardedMethod, RENDER_METHOD, fallback_markup, with_error_handling};
pub use logging::{LoggingError, init_logging};
pub use notifications::{
    DEFAULT_CAPACITY, Notification, NotificationDetails, NotificationLevel, NotificationLog,
};
pub use registry::{Handler, PluginRegistry};
pub use runtime::{serve, serve_with};
