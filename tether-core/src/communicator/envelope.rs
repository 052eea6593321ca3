//! Wire envelopes exchanged with the host
//!
//! Inbound: `{"message": <tag>, "content": <any>}`.
//! Outbound: `{"type": <tag>, "response": <any>}`, where `type` always
//! mirrors the inbound tag it answers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tether_plugin_api::{QuickAction, SidePanelConfig};

/// Host announces it is listening
pub const PLUGIN_READY: &str = "PLUGIN_READY";
/// Host asks the plugin to initialize
pub const PLUGIN_INIT: &str = "PLUGIN_INIT";
/// Host asks for the plugin's markup
pub const PLUGIN_RENDER: &str = "PLUGIN_RENDER";
/// Host forwards a UI interaction to a named handler
pub const UI_MESSAGE: &str = "UI_MESSAGE";

/// Handler used when a `UI_MESSAGE` names none
pub const DEFAULT_HANDLER: &str = "defaultHandler";

/// Envelope received from the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEnvelope {
    pub message: String,
    #[serde(default)]
    pub content: Value,
}

impl InboundEnvelope {
    pub fn new(message: impl Into<String>, content: Value) -> Self {
        Self {
            message: message.into(),
            content,
        }
    }
}

/// Envelope sent back to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub response: Value,
}

impl OutboundEnvelope {
    pub fn new(kind: impl Into<String>, response: Value) -> Self {
        Self {
            kind: kind.into(),
            response,
        }
    }
}

/// Decoded `UI_MESSAGE` content
#[derive(Debug, Clone, PartialEq)]
pub struct UiMessage {
    pub handler: String,
    pub content: Value,
}

impl UiMessage {
    /// Decode `{handler?, content}`.
    ///
    /// Objects always use that shape: a missing `handler` selects
    /// [`DEFAULT_HANDLER`] and a missing `content` is null. A non-object
    /// payload is delivered whole to [`DEFAULT_HANDLER`].
    pub fn from_content(content: Value) -> Self {
        match content {
            Value::Object(mut fields) => {
                let handler = match fields.remove("handler") {
                    Some(Value::String(name)) => name,
                    _ => DEFAULT_HANDLER.to_string(),
                };
                Self {
                    handler,
                    content: fields.remove("content").unwrap_or(Value::Null),
                }
            }
            other => Self {
                handler: DEFAULT_HANDLER.to_string(),
                content: other,
            },
        }
    }
}

/// Response body for `PLUGIN_INIT`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitResponse {
    pub quick_actions: Vec<QuickAction>,
    pub side_panel_actions: Option<SidePanelConfig>,
}
