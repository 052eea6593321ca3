//! Uniform error handling for plugin methods
//!
//! [`with_error_handling`] wraps a plugin method so that every failure is
//! reported to the plugin, recorded in the [`NotificationLog`] and turned
//! into a predictable result:
//!
//! - `render` succeeds with its markup unchanged and fails with fallback
//!   markup (custom or generated) unless configured to re-raise.
//! - Every other method succeeds with `{"success": true, "result": ...}`
//!   and fails with `{"success": false, "error": ..., "notificationId": ...}`.
//!
//! Panics inside the wrapped future are caught and handled like errors.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::FutureExt;
use serde_json::{Value, json};
use tether_plugin_api::{ErrorHandling, Plugin, PluginError};
use tracing::warn;

use crate::notifications::{NotificationDetails, NotificationLog};

/// Name of the render entry point
pub const RENDER_METHOD: &str = "render";

/// Name of the init entry point
pub const INIT_METHOD: &str = "init";

/// Boxed future returned by wrapped targets
pub type MethodFuture = Pin<Box<dyn Future<Output = Result<Value, PluginError>> + Send>>;

type Target = Arc<dyn Fn(Value) -> MethodFuture + Send + Sync>;

/// Collaborators a wrapped method reports failures to
#[derive(Clone)]
pub struct GuardScope {
    /// Log that receives one error notification per failure
    pub notifications: Arc<NotificationLog>,
    /// Plugin whose `error()` hook reports the failure
    pub reporter: Arc<dyn Plugin>,
}

impl GuardScope {
    pub fn new(notifications: Arc<NotificationLog>, reporter: Arc<dyn Plugin>) -> Self {
        Self {
            notifications,
            reporter,
        }
    }
}

/// A plugin method wrapped by [`with_error_handling`]
#[derive(Clone)]
pub struct GuardedMethod {
    method: Arc<str>,
    target: Target,
    config: ErrorHandling,
    scope: GuardScope,
}

/// Wrap `target` so its failures are normalized.
///
/// `target` receives the call arguments as JSON; the wrapped method keeps
/// that signature. Wrapping a [`GuardedMethod`] again nests the behaviour:
/// the outer layer sees the inner layer's normalized result as a success.
pub fn with_error_handling<F, Fut>(
    method: impl Into<String>,
    target: F,
    config: ErrorHandling,
    scope: GuardScope,
) -> GuardedMethod
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, PluginError>> + Send + 'static,
{
    let target: Target = Arc::new(move |args| -> MethodFuture { Box::pin(target(args)) });
    GuardedMethod {
        method: Arc::from(method.into()),
        target,
        config,
        scope,
    }
}

impl GuardedMethod {
    /// Name of the wrapped method
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The same wrapped method reporting failures to `reporter`
    pub fn with_reporter(&self, reporter: Arc<dyn Plugin>) -> Self {
        let mut rebound = self.clone();
        rebound.scope.reporter = reporter;
        rebound
    }

    /// Whether this wraps the render entry point
    pub fn is_render(&self) -> bool {
        &*self.method == RENDER_METHOD
    }

    /// Call the wrapped method.
    ///
    /// Only a `render` failure configured without error UI returns `Err`.
    pub async fn call(&self, args: Value) -> Result<Value, PluginError> {
        let outcome = AssertUnwindSafe((self.target)(args.clone()))
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(result) => result,
            Err(panic) => Err(PluginError::Panicked(panic_message(panic.as_ref()))),
        };

        match result {
            Ok(value) if self.is_render() => Ok(value),
            Ok(value) => Ok(json!({ "success": true, "result": value })),
            Err(error) => self.handle_failure(error, args),
        }
    }

    fn handle_failure(&self, error: PluginError, args: Value) -> Result<Value, PluginError> {
        let message = self
            .config
            .error_message
            .clone()
            .unwrap_or_else(|| error.to_string());

        warn!(method = %self.method, error = %error, "Plugin method failed");
        self.scope.reporter.error(&error);

        let notification = self.scope.notifications.error(
            message.clone(),
            Some(NotificationDetails {
                stack: Some(error.stack()),
                context: self.config.context.clone(),
                method: Some(self.method.to_string()),
                args: Some(args),
            }),
        );

        // Second report is the host-visible alert.
        if self.config.show_notifications {
            self.scope.reporter.error(&error);
        }

        if !self.is_render() {
            return Ok(json!({
                "success": false,
                "error": message,
                "notificationId": notification.id(),
            }));
        }

        let context = self.config.context.as_ref();
        if let Some(renderer) = &self.config.error_ui_renderer {
            Ok(Value::String(renderer(&error, context)))
        } else if self.config.return_error_ui {
            Ok(Value::String(fallback_markup(&message, context)))
        } else {
            Err(error)
        }
    }
}

/// Generated markup shown in place of a failed render
pub fn fallback_markup(message: &str, context: Option<&Value>) -> String {
    let mut markup = String::from("<div class=\"plugin-error\">");
    markup.push_str("<h3>Error rendering plugin</h3>");
    markup.push_str(&format!("<p>{}</p>", escape_html(message)));
    if let Some(context) = context {
        let pretty = serde_json::to_string_pretty(context).unwrap_or_else(|_| context.to_string());
        markup.push_str(&format!("<pre>{}</pre>", escape_html(&pretty)));
    }
    markup.push_str("</div>");
    markup
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
