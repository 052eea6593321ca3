//! Notification types

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Severity of a notification
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Error,
    Warning,
    #[default]
    Info,
}

impl std::fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// Optional diagnostic payload attached to a notification
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct NotificationDetails {
    /// Error cause chain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// Caller-supplied context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    /// Name of the method that raised the notification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Arguments the method was called with
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
}

/// A diagnostic record; only [`NotificationLog`](super::NotificationLog)
/// creates these and they are read-only afterwards.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Notification {
    message: String,
    level: NotificationLevel,
    timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<NotificationDetails>,
}

impl Notification {
    pub(super) fn new(
        message: String,
        level: NotificationLevel,
        timestamp: DateTime<Utc>,
        details: Option<NotificationDetails>,
    ) -> Self {
        Self {
            message,
            level,
            timestamp,
            details,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn level(&self) -> NotificationLevel {
        self.level
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn details(&self) -> Option<&NotificationDetails> {
        self.details.as_ref()
    }

    /// Identifier handed to the host: the timestamp in milliseconds since
    /// the Unix epoch, as a string
    pub fn id(&self) -> String {
        self.timestamp.timestamp_millis().to_string()
    }
}
