//! Error-handling configuration for wrapped plugin methods

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::PluginError;

/// Custom renderer for failed `render` calls: `(error, context) -> markup`
pub type ErrorRenderer = Arc<dyn Fn(&PluginError, Option<&Value>) -> String + Send + Sync>;

/// How the runtime treats failures of one wrapped method.
#[derive(Clone)]
pub struct ErrorHandling {
    /// Message shown instead of the error's own message
    pub error_message: Option<String>,
    /// Return generated fallback markup when `render` fails
    pub return_error_ui: bool,
    /// Custom fallback markup for `render` failures
    pub error_ui_renderer: Option<ErrorRenderer>,
    /// Alert the host through the plugin's error hook
    pub show_notifications: bool,
    /// Caller-supplied context attached to the failure notification
    pub context: Option<Value>,
}

impl Default for ErrorHandling {
    fn default() -> Self {
        Self {
            error_message: None,
            return_error_ui: true,
            error_ui_renderer: None,
            show_notifications: true,
            context: None,
        }
    }
}

impl ErrorHandling {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: override the displayed message
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Builder: attach context to failure notifications
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Builder: render failures with a custom renderer
    pub fn with_renderer<F>(mut self, renderer: F) -> Self
    where
        F: Fn(&PluginError, Option<&Value>) -> String + Send + Sync + 'static,
    {
        self.error_ui_renderer = Some(Arc::new(renderer));
        self
    }

    /// Builder: re-raise `render` failures instead of returning fallback markup
    pub fn without_error_ui(mut self) -> Self {
        self.return_error_ui = false;
        self
    }

    /// Builder: skip host-visible alerting
    pub fn without_notifications(mut self) -> Self {
        self.show_notifications = false;
        self
    }
}

impl fmt::Debug for ErrorHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHandling")
            .field("error_message", &self.error_message)
            .field("return_error_ui", &self.return_error_ui)
            .field("error_ui_renderer", &self.error_ui_renderer.is_some())
            .field("show_notifications", &self.show_notifications)
            .field("context", &self.context)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let handling = ErrorHandling::default();
        assert!(handling.error_message.is_none());
        assert!(handling.return_error_ui);
        assert!(handling.error_ui_renderer.is_none());
        assert!(handling.show_notifications);
        assert!(handling.context.is_none());
    }

    #[test]
    fn test_builder_sets_fields() {
        let handling = ErrorHandling::new()
            .with_error_message("Something broke")
            .with_context(json!({"view": "main"}))
            .without_error_ui()
            .without_notifications();

        assert_eq!(handling.error_message.as_deref(), Some("Something broke"));
        assert_eq!(handling.context, Some(json!({"view": "main"})));
        assert!(!handling.return_error_ui);
        assert!(!handling.show_notifications);
    }

    #[test]
    fn test_renderer_is_invoked_with_error() {
        let handling = ErrorHandling::new().with_renderer(|err, _| format!("<b>{err}</b>"));
        let renderer = handling.error_ui_renderer.expect("renderer set");
        let markup = renderer(&PluginError::custom("boom"), None);
        assert_eq!(markup, "<b>boom</b>");
    }

    #[test]
    fn test_debug_hides_renderer_body() {
        let handling = ErrorHandling::new().with_renderer(|_, _| String::new());
        let debug = format!("{handling:?}");
        assert!(debug.contains("error_ui_renderer: true"));
    }
}
