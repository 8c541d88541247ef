use anyhow::Result;
use futures::Stream;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde_json::Value;
use std::fmt::Display;
use std::pin::Pin;

use super::configs::UpstreamConfig;
use crate::errors::{RelayError, RelayResult};
use crate::relay::lines::lines;

/// Upstream body as lines, ready for the relay loop.
pub type LineStream = Pin<Box<dyn Stream<Item = RelayResult<String>> + Send>>;

/// Issues the streaming POST to the agent endpoint.
pub struct UpstreamClient {
    client: Client,
    endpoint: String,
    auth_header: String,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.stream_timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.agent_endpoint.clone(),
            auth_header: config.bearer(),
        })
    }

    /// Send `body` and, once the upstream has accepted it, hand back its
    /// body as lines.
    ///
    /// A non-success status is fatal for this call: the error body is read in
    /// full and returned as `UpstreamRejected` so nothing is ever streamed for
    /// a rejected request.
    pub async fn open_stream(&self, body: &Value) -> RelayResult<LineStream> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, &self.auth_header)
            .header(ACCEPT, "text/event-stream")
            .json(body)
            .send()
            .await
            .map_err(|e| RelayError::UpstreamUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = rejection_body(response.text().await);
            tracing::warn!(status = status.as_u16(), "agent API rejected request");
            return Err(RelayError::UpstreamRejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Box::pin(lines(response.bytes_stream())))
    }
}

/// The error body of a rejected call, or a description of why it could not
/// be read.
fn rejection_body<E: Display>(body: Result<String, E>) -> String {
    body.unwrap_or_else(|e| {
        tracing::warn!("failed to read agent API error body: {}", e);
        format!("<error body unreadable: {}>", e)
    })
}
