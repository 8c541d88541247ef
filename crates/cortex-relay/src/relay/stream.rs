use futures::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{timeout, timeout_at, Instant};
use tokio_stream::wrappers::ReceiverStream;

use super::filter::FieldFilter;
use super::sse::{error_event, render_line};
use crate::errors::RelayResult;
use crate::models::agent_request::{passthrough, AgentRequest, RequestTransform};
use crate::upstream::UpstreamClient;

/// Chunks buffered between the relay task and the client connection.
const RELAY_CHANNEL_CAPACITY: usize = 8;

/// How long a stalled client gets to take the terminal error event.
const TERMINAL_EVENT_GRACE: Duration = Duration::from_secs(1);

/// How a single relay pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The upstream stream ended normally.
    Completed,
    /// The upstream failed mid-stream; one error event was sent.
    UpstreamFailed,
    /// The overall deadline elapsed; one error event was sent.
    TimedOut,
    /// The client went away; the upstream was dropped.
    ClientDisconnected,
}

/// Forwards an upstream event stream to one client, redacting as it goes.
pub struct EventStreamRelay {
    upstream: UpstreamClient,
    filter: FieldFilter,
    transform: RequestTransform,
    stream_timeout: Duration,
}

impl EventStreamRelay {
    pub fn new(upstream: UpstreamClient, filter: FieldFilter, stream_timeout: Duration) -> Self {
        Self {
            upstream,
            filter,
            transform: passthrough(),
            stream_timeout,
        }
    }

    /// Replace the hook applied to request bodies before dispatch.
    pub fn with_transform(mut self, transform: RequestTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Run `request` through the transform hook.
    pub fn prepare(&self, request: &AgentRequest) -> RelayResult<serde_json::Value> {
        Ok((self.transform)(request.to_value()?))
    }

    /// Dispatch `request` upstream and start relaying its response.
    ///
    /// Returns only once the upstream has accepted the request, so every
    /// pre-flight failure reaches the caller before a single byte is streamed.
    pub async fn start(
        self: &Arc<Self>,
        request: &AgentRequest,
    ) -> RelayResult<ReceiverStream<String>> {
        let body = self.prepare(request)?;
        let lines = self.upstream.open_stream(&body).await?;

        let (tx, rx) = mpsc::channel(RELAY_CHANNEL_CAPACITY);
        let relay = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = relay.pump(lines, &tx).await;
            tracing::info!(?outcome, "agent stream relay finished");
        });

        Ok(ReceiverStream::new(rx))
    }

    /// Pull lines, render them, and push them to `tx` one at a time.
    ///
    /// Each line is forwarded before the next one is read, and a send only
    /// completes once the channel has room, so a slow client slows the
    /// upstream read instead of growing a buffer. The deadline bounds both
    /// the reads and the sends.
    pub async fn pump<S>(&self, lines: S, tx: &mpsc::Sender<String>) -> RelayOutcome
    where
        S: Stream<Item = RelayResult<String>>,
    {
        let mut lines = Box::pin(lines);
        let deadline = Instant::now() + self.stream_timeout;

        loop {
            let next = tokio::select! {
                _ = tx.closed() => return RelayOutcome::ClientDisconnected,
                next = timeout_at(deadline, lines.next()) => next,
            };

            match next {
                Ok(Some(Ok(line))) => {
                    match timeout_at(deadline, tx.send(render_line(&line, &self.filter))).await {
                        Ok(Ok(())) => {}
                        Ok(Err(_)) => return RelayOutcome::ClientDisconnected,
                        Err(_) => return self.timed_out(tx).await,
                    }
                }
                Ok(Some(Err(e))) => {
                    tracing::warn!("agent stream failed mid-flight: {}", e);
                    send_terminal(tx, error_event(&e.to_string())).await;
                    return RelayOutcome::UpstreamFailed;
                }
                Ok(None) => return RelayOutcome::Completed,
                Err(_) => return self.timed_out(tx).await,
            }
        }
    }

    async fn timed_out(&self, tx: &mpsc::Sender<String>) -> RelayOutcome {
        tracing::warn!(timeout = ?self.stream_timeout, "agent stream timed out");
        send_terminal(tx, error_event("Upstream stream timed out")).await;
        RelayOutcome::TimedOut
    }
}

/// Best-effort delivery of the terminal event. A client that is not reading
/// loses it rather than holding the relay open.
async fn send_terminal(tx: &mpsc::Sender<String>, event: String) {
    if timeout(TERMINAL_EVENT_GRACE, tx.send(event)).await.is_err() {
        tracing::debug!("client not reading, terminal event dropped");
    }
}
