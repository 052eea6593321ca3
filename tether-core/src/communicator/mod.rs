//! Message routing between the host and the plugin
//!
//! The [`Communicator`] reads JSON-lines envelopes, re-emits each inbound
//! tag to the reaction registered for it and sends the reaction's result
//! back as `{"type": <tag>, "response": ...}`. Tags are not matched by a
//! fixed conditional: adding a tag only takes another [`Communicator::on`].
//!
//! ```text
//!   reader ──lines──▶ run() ──spawn──▶ dispatch() ──▶ reaction
//!                                                        │
//!   writer ◀──lines── write_outbound() ◀──mpsc──────────┘
//! ```

mod envelope;

pub use envelope::{
    DEFAULT_HANDLER, InboundEnvelope, InitResponse, OutboundEnvelope, PLUGIN_INIT, PLUGIN_READY,
    PLUGIN_RENDER, UI_MESSAGE, UiMessage,
};

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::error::CommunicatorError;
use crate::registry::PluginRegistry;

/// Capacity of the outbound envelope channel
pub const OUTBOUND_BUFFER: usize = 64;

/// Boxed future returned by reactions
pub type ReactionFuture = Pin<Box<dyn Future<Output = Value> + Send>>;

/// Produces the response for one inbound tag
pub type Reaction = Arc<dyn Fn(Value) -> ReactionFuture + Send + Sync>;

/// Create the channel connecting a [`Communicator`] to its writer task
pub fn outbound_channel() -> (
    mpsc::Sender<OutboundEnvelope>,
    mpsc::Receiver<OutboundEnvelope>,
) {
    mpsc::channel(OUTBOUND_BUFFER)
}

/// Writer task: serialize envelopes one per line until every sender is gone
pub async fn write_outbound<W>(
    mut outbound: mpsc::Receiver<OutboundEnvelope>,
    mut writer: W,
) -> Result<(), CommunicatorError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(envelope) = outbound.recv().await {
        let mut line = serde_json::to_vec(&envelope)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        writer.flush().await?;
        trace!(tag = %envelope.kind, "Envelope sent");
    }
    debug!("Outbound channel drained");
    Ok(())
}

/// Routes inbound envelopes to reactions and replies over the channel
#[derive(Clone)]
pub struct Communicator {
    reactions: Arc<RwLock<HashMap<String, Reaction>>>,
    outbound: mpsc::Sender<OutboundEnvelope>,
}

impl Communicator {
    /// Create a communicator with no reactions
    pub fn new(outbound: mpsc::Sender<OutboundEnvelope>) -> Self {
        Self {
            reactions: Arc::new(RwLock::new(HashMap::new())),
            outbound,
        }
    }

    /// Create a communicator answering the four protocol tags from `registry`
    pub fn with_registry(
        registry: Arc<PluginRegistry>,
        outbound: mpsc::Sender<OutboundEnvelope>,
    ) -> Self {
        let communicator = Self::new(outbound);

        communicator.on(PLUGIN_READY, |_| async { Value::Bool(true) });

        let init_registry = Arc::clone(&registry);
        communicator.on(PLUGIN_INIT, move |_| {
            let registry = Arc::clone(&init_registry);
            async move { init_response(&registry).await }
        });

        let render_registry = Arc::clone(&registry);
        communicator.on(PLUGIN_RENDER, move |_| {
            let registry = Arc::clone(&render_registry);
            async move {
                match registry.call_renderer().await {
                    Some(Ok(markup)) => markup,
                    Some(Err(e)) => {
                        error!(error = %e, "Render failed and was re-raised");
                        Value::Null
                    }
                    None => Value::Null,
                }
            }
        });

        communicator.on(UI_MESSAGE, move |content| {
            let registry = Arc::clone(&registry);
            async move {
                let message = UiMessage::from_content(content);
                registry.call_handler(&message.handler, message.content).await
            }
        });

        communicator
    }

    /// Register the reaction for `tag`, replacing any previous one
    pub fn on<F, Fut>(&self, tag: impl Into<String>, reaction: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Value> + Send + 'static,
    {
        let reaction: Reaction =
            Arc::new(move |content| -> ReactionFuture { Box::pin(reaction(content)) });
        self.reactions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(tag.into(), reaction);
    }

    /// Check whether a reaction is registered for `tag`
    pub fn has_reaction(&self, tag: &str) -> bool {
        self.reactions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(tag)
    }

    /// Log an inbound envelope and re-emit its tag
    pub async fn dispatch(&self, inbound: InboundEnvelope) -> Result<(), CommunicatorError> {
        debug!(tag = %inbound.message, content = %inbound.content, "Inbound message");
        self.emit(&inbound.message, inbound.content).await
    }

    /// Run the reaction for `tag` and send its response.
    ///
    /// An unknown tag is logged and produces no reply.
    pub async fn emit(&self, tag: &str, content: Value) -> Result<(), CommunicatorError> {
        let reaction = self
            .reactions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(tag)
            .cloned();

        let Some(reaction) = reaction else {
            warn!(tag = %tag, "No reaction for inbound tag, ignoring");
            return Ok(());
        };

        let response = reaction(content).await;
        self.outbound
            .send(OutboundEnvelope::new(tag, response))
            .await
            .map_err(|_| CommunicatorError::ChannelClosed)
    }

    /// Read JSON-lines envelopes from `reader` until EOF or `shutdown`.
    ///
    /// Each envelope is dispatched on its own task, so replies may leave in
    /// a different order than their requests arrived. At EOF the loop waits
    /// for in-flight replies; on shutdown it aborts them.
    pub async fn run<R>(
        &self,
        mut reader: R,
        shutdown: CancellationToken,
    ) -> Result<(), CommunicatorError>
    where
        R: AsyncBufRead + Unpin,
    {
        // Partial reads stay in `line` when another branch wins the select.
        let mut line = Vec::new();
        let mut in_flight = JoinSet::new();

        info!("Communicator listening");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(in_flight = in_flight.len(), "Shutdown requested, aborting in-flight replies");
                    in_flight.abort_all();
                    return Ok(());
                }
                read = reader.read_until(b'\n', &mut line) => {
                    if read? == 0 {
                        debug!(in_flight = in_flight.len(), "Inbound channel closed");
                        break;
                    }
                    let bytes = std::mem::take(&mut line);
                    if bytes.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    match serde_json::from_slice::<InboundEnvelope>(&bytes) {
                        Ok(inbound) => {
                            let communicator = self.clone();
                            in_flight.spawn(async move { communicator.dispatch(inbound).await });
                        }
                        Err(e) => warn!(error = %e, "Skipping malformed inbound line"),
                    }
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    reap(joined)?;
                }
            }
        }

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    in_flight.abort_all();
                    break;
                }
                joined = in_flight.join_next() => match joined {
                    Some(joined) => reap(joined)?,
                    None => break,
                },
            }
        }

        info!("Communicator stopped");
        Ok(())
    }
}

async fn init_response(registry: &PluginRegistry) -> Value {
    match registry.call_init().await {
        Some(Ok(result)) if result["success"] == Value::Bool(false) => {
            warn!(error = %result["error"], "Plugin init failed");
        }
        Some(Err(e)) => error!(error = %e, "Plugin init failed"),
        _ => {}
    }

    let response = InitResponse {
        quick_actions: registry.quick_actions(),
        side_panel_actions: registry.side_panel_config(),
    };
    serde_json::to_value(&response).unwrap_or_else(|e| {
        error!(error = %e, "Failed to serialize init response");
        Value::Null
    })
}

fn reap(joined: Result<Result<(), CommunicatorError>, JoinError>) -> Result<(), CommunicatorError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e),
        Err(e) if e.is_panic() => {
            error!(error = %e, "Reaction panicked");
            Ok(())
        }
        Err(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::NotificationLog;
    use async_trait::async_trait;
    use serde_json::json;
    use tether_plugin_api::{
        ErrorHandling, Plugin, PluginError, PluginMetadata, QuickAction, QuickActions,
    };
    use tokio::io::BufReader;

    struct FailingRender {
        reraise: bool,
    }

    #[async_trait]
    impl Plugin for FailingRender {
        fn metadata(&self) -> PluginMetadata {
            PluginMetadata::new("failing", "0.1.0")
        }

        async fn init(&self) -> Result<(), PluginError> {
            Ok(())
        }

        async fn render(&self) -> Result<String, PluginError> {
            Err(PluginError::custom("render broke"))
        }

        fn error(&self, _error: &PluginError) {}

        fn error_handling(&self, _method: &str) -> ErrorHandling {
            if self.reraise {
                ErrorHandling::new().without_error_ui()
            } else {
                ErrorHandling::new()
            }
        }

        fn as_quick_actions(&self) -> Option<&dyn QuickActions> {
            Some(self)
        }
    }

    impl QuickActions for FailingRender {
        fn define_quick_actions(&self) -> Vec<QuickAction> {
            vec![QuickAction::new("Retry", "retry")]
        }
    }

    fn setup() -> (
        Arc<PluginRegistry>,
        Communicator,
        mpsc::Receiver<OutboundEnvelope>,
    ) {
        let registry = Arc::new(PluginRegistry::new(Arc::new(NotificationLog::default())));
        let (tx, rx) = outbound_channel();
        let communicator = Communicator::with_registry(Arc::clone(&registry), tx);
        (registry, communicator, rx)
    }

    #[tokio::test]
    async fn ready_produces_exactly_one_reply() {
        let (_registry, communicator, mut rx) = setup();
        communicator.emit(PLUGIN_READY, Value::Null).await.unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            OutboundEnvelope::new(PLUGIN_READY, json!(true))
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn ui_message_routes_to_named_handler() {
        let (registry, communicator, mut rx) = setup();
        registry.register_handler("h", |data| async move { json!({ "got": data }) });

        communicator
            .dispatch(InboundEnvelope::new(UI_MESSAGE, json!({"handler": "h", "content": "c"})))
            .await
            .unwrap();

        let reply = rx.try_recv().unwrap();
        assert_eq!(reply.kind, UI_MESSAGE);
        assert_eq!(reply.response, json!({"got": "c"}));
    }

    #[tokio::test]
    async fn ui_message_without_handler_uses_default() {
        let (registry, communicator, mut rx) = setup();
        registry.register_handler(DEFAULT_HANDLER, |data| async move { data });

        communicator.emit(UI_MESSAGE, json!({"content": 5})).await.unwrap();
        assert_eq!(rx.try_recv().unwrap().response, json!(5));
    }

    #[tokio::test]
    async fn unknown_tag_produces_no_reply() {
        let (_registry, communicator, mut rx) = setup();
        communicator.emit("PLUGIN_TELEPORT", json!({})).await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn on_adds_new_tag_without_touching_the_loop() {
        let (_registry, communicator, mut rx) = setup();
        communicator.on("PING", |content| async move { json!({ "pong": content }) });
        assert!(communicator.has_reaction("PING"));

        communicator.emit("PING", json!(1)).await.unwrap();
        assert_eq!(rx.try_recv().unwrap(), OutboundEnvelope::new("PING", json!({"pong": 1})));
    }

    #[tokio::test]
    async fn init_reports_capabilities() {
        let (registry, communicator, mut rx) = setup();
        registry.register_plugin(Arc::new(FailingRender { reraise: false }));

        communicator.emit(PLUGIN_INIT, Value::Null).await.unwrap();
        let reply = rx.try_recv().unwrap();
        assert_eq!(reply.response["quickActions"][0]["message_type"], "retry");
        assert_eq!(reply.response["sidePanelActions"], Value::Null);
    }

    #[tokio::test]
    async fn init_without_plugin_reports_empty_capabilities() {
        let (_registry, communicator, mut rx) = setup();
        communicator.emit(PLUGIN_INIT, Value::Null).await.unwrap();
        assert_eq!(
            rx.try_recv().unwrap().response,
            json!({"quickActions": [], "sidePanelActions": null})
        );
    }

    #[tokio::test]
    async fn render_failure_replies_with_fallback_markup() {
        let (registry, communicator, mut rx) = setup();
        registry.register_plugin(Arc::new(FailingRender { reraise: false }));

        communicator.emit(PLUGIN_RENDER, Value::Null).await.unwrap();
        let markup = rx.try_recv().unwrap().response;
        assert!(markup.as_str().unwrap().contains("render broke"));
    }

    #[tokio::test]
    async fn reraised_render_failure_replies_null() {
        let (registry, communicator, mut rx) = setup();
        registry.register_plugin(Arc::new(FailingRender { reraise: true }));

        communicator.emit(PLUGIN_RENDER, Value::Null).await.unwrap();
        assert_eq!(rx.try_recv().unwrap().response, Value::Null);
    }

    #[tokio::test]
    async fn render_without_plugin_replies_null() {
        let (_registry, communicator, mut rx) = setup();
        communicator.emit(PLUGIN_RENDER, Value::Null).await.unwrap();
        assert_eq!(rx.try_recv().unwrap().response, Value::Null);
    }

    #[tokio::test]
    async fn run_skips_malformed_lines_and_drains_at_eof() {
        let (_registry, communicator, mut rx) = setup();
        let input = "not json\n\n{\"message\":\"PLUGIN_READY\"}\n";

        communicator
            .run(BufReader::new(input.as_bytes()), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(rx.try_recv().unwrap().kind, PLUGIN_READY);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn run_skips_lines_that_are_not_utf8() {
        let (_registry, communicator, mut rx) = setup();
        let input: &[u8] = b"\xff\xfe\n{\"message\":\"PLUGIN_READY\"}";

        communicator
            .run(BufReader::new(input), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(rx.try_recv().unwrap().kind, PLUGIN_READY);
    }

    #[tokio::test]
    async fn emit_fails_when_writer_is_gone() {
        let (_registry, communicator, rx) = setup();
        drop(rx);

        let result = communicator.emit(PLUGIN_READY, Value::Null).await;
        assert!(matches!(result, Err(CommunicatorError::ChannelClosed)));
    }

    #[tokio::test]
    async fn write_outbound_emits_one_line_per_envelope() {
        let (tx, rx) = outbound_channel();
        tx.send(OutboundEnvelope::new(PLUGIN_READY, json!(true))).await.unwrap();
        tx.send(OutboundEnvelope::new(UI_MESSAGE, json!("x"))).await.unwrap();
        drop(tx);

        let mut written = Vec::new();
        write_outbound(rx, &mut written).await.unwrap();

        let text = String::from_utf8(written).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"type":"PLUGIN_READY","response":true}"#);
        assert_eq!(lines[1], r#"{"type":"UI_MESSAGE","response":"x"}"#);
    }
}
