//! Plugin types and metadata structures

use serde::{Deserialize, Serialize};

/// Metadata describing the hosted plugin
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PluginMetadata {
    /// Plugin name
    pub name: String,
    /// Plugin version (semver)
    pub version: String,
    /// Plugin author
    #[serde(default)]
    pub author: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Icon identifier or URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl PluginMetadata {
    /// Create metadata with a name and version
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            author: String::new(),
            description: String::new(),
            icon: None,
        }
    }

    /// Builder: set the author
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Builder: set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: set the icon
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// A shortcut the host surfaces for the plugin.
///
/// Selecting it makes the host send a `UI_MESSAGE` whose handler is
/// `message_type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuickAction {
    /// Display name
    pub name: String,
    /// Handler name the host sends back when the action fires
    pub message_type: String,
    /// Secondary text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Icon identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl QuickAction {
    /// Create a quick action without subtitle or icon
    pub fn new(name: impl Into<String>, message_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message_type: message_type.into(),
            subtitle: None,
            icon: None,
        }
    }
}

/// Side panel entry exposed by the plugin
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SidePanelConfig {
    /// Icon identifier
    pub icon: String,
    /// Panel label
    pub label: String,
    /// Submenu entries
    pub submenu_list: Vec<SubmenuItem>,
}

/// One entry of a side panel submenu
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmenuItem {
    pub id: String,
    pub name: String,
    pub message_type: String,
}
