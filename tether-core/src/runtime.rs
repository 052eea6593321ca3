//! Serving a plugin over a byte channel

use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::communicator::{outbound_channel, write_outbound};
use crate::context::RuntimeContext;
use crate::error::CommunicatorError;

/// Serve the context's plugin over stdin/stdout until EOF or `shutdown`
pub async fn serve(
    context: &RuntimeContext,
    shutdown: CancellationToken,
) -> Result<(), CommunicatorError> {
    let stdin = BufReader::new(tokio::io::stdin());
    serve_with(context, stdin, tokio::io::stdout(), shutdown).await
}

/// Serve the context's plugin over any reader/writer pair.
///
/// A write failure stops the read loop and is returned.
pub async fn serve_with<R, W>(
    context: &RuntimeContext,
    reader: R,
    writer: W,
    shutdown: CancellationToken,
) -> Result<(), CommunicatorError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    if let Some(plugin) = context.registry().active_plugin() {
        info!(plugin = %plugin.metadata().name, "Serving plugin");
    }

    let (outbound_tx, outbound_rx) = outbound_channel();
    let communicator = context.communicator(outbound_tx);
    let stop = shutdown.child_token();

    let writer_stop = stop.clone();
    let writer_task = tokio::spawn(async move {
        let result = write_outbound(outbound_rx, writer).await;
        if let Err(e) = &result {
            error!(error = %e, "Outbound writer failed");
            writer_stop.cancel();
        }
        result
    });

    let read_result = communicator.run(reader, stop).await;
    // Last sender; the writer exits once in-flight replies are flushed.
    drop(communicator);

    writer_task
        .await
        .map_err(|_| CommunicatorError::WriterPanicked)??;
    read_result
}
