//! Notification log backed by a ring buffer

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use super::{Notification, NotificationDetails, NotificationLevel};
use crate::buffer::RingBuffer;

/// Default log capacity: 100 notifications
pub const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(100) {
    Some(capacity) => capacity,
    None => unreachable!(),
};

struct LogState {
    entries: RingBuffer<Notification>,
    /// Timestamp of the newest notification ever added; survives eviction
    /// and clear so timestamps never go backwards
    last_timestamp: Option<DateTime<Utc>>,
}

/// Bounded history of diagnostic events.
///
/// Capacity is fixed at construction. Adding to a full log evicts the
/// oldest notification; nothing is ever rejected.
pub struct NotificationLog {
    state: Mutex<LogState>,
}

impl NotificationLog {
    /// Create a log with the given capacity
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            state: Mutex::new(LogState {
                entries: RingBuffer::new(capacity),
                last_timestamp: None,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, LogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a notification and return it
    pub fn add_notification(
        &self,
        message: impl Into<String>,
        level: NotificationLevel,
        details: Option<NotificationDetails>,
    ) -> Notification {
        let mut state = self.state();

        let now = Utc::now();
        let timestamp = match state.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };
        state.last_timestamp = Some(timestamp);

        let notification = Notification::new(message.into(), level, timestamp, details);
        if let Some(evicted) = state.entries.push(notification.clone()) {
            tracing::trace!(message = %evicted.message(), "Notification evicted");
        }
        notification
    }

    /// Record an info notification
    pub fn info(&self, message: impl Into<String>) -> Notification {
        self.add_notification(message, NotificationLevel::Info, None)
    }

    /// Record a warning notification
    pub fn warning(&self, message: impl Into<String>) -> Notification {
        self.add_notification(message, NotificationLevel::Warning, None)
    }

    /// Record an error notification
    pub fn error(
        &self,
        message: impl Into<String>,
        details: Option<NotificationDetails>,
    ) -> Notification {
        self.add_notification(message, NotificationLevel::Error, details)
    }

    /// Snapshot of all notifications, oldest first
    pub fn notifications(&self) -> Vec<Notification> {
        self.state().entries.to_vec()
    }

    /// Newest notification
    pub fn latest_notification(&self) -> Option<Notification> {
        self.state().entries.last().cloned()
    }

    /// Notifications of one level, oldest first
    pub fn notifications_by_level(&self, level: NotificationLevel) -> Vec<Notification> {
        self.state()
            .entries
            .iter()
            .filter(|n| n.level() == level)
            .cloned()
            .collect()
    }

    /// Drop all notifications
    pub fn clear_notifications(&self) {
        self.state().entries.clear();
    }

    /// Number of stored notifications
    pub fn count(&self) -> usize {
        self.state().entries.len()
    }

    /// Fixed capacity
    pub fn capacity(&self) -> usize {
        self.state().entries.capacity()
    }
}

impl Default for NotificationLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
