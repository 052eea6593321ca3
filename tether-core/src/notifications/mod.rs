//! Bounded notification log
//!
//! Diagnostic events raised while serving the plugin are kept in a
//! fixed-capacity [`NotificationLog`]; the oldest entry is dropped silently
//! once the log is full. Contents never outlive the process.

mod log;
mod types;

pub use log::{DEFAULT_CAPACITY, NotificationLog};
pub use types::{Notification, NotificationDetails, NotificationLevel};
