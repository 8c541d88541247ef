use anyhow::Result;
use cortex_relay::{
    errors::RelayError,
    models::agent_request::AgentRequest,
    relay::{EventStreamRelay, FieldFilter},
    upstream::{UpstreamClient, UpstreamConfig},
};
use futures::StreamExt;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AGENT_PATH: &str = "/api/v2/cortex/agent:run";

/// Builds a relay pointed at a mock agent endpoint
struct RelayHarness {
    server: MockServer,
    relay: Arc<EventStreamRelay>,
}

impl RelayHarness {
    async fn new(filter: FieldFilter) -> Result<Self> {
        let server = MockServer::start().await;
        let config = UpstreamConfig {
            pat_token: "pat-test".to_string(),
            agent_endpoint: format!("{}{}", server.uri(), AGENT_PATH),
            sql_endpoint: format!("{}/api/v2/statements", server.uri()),
            database: "DB".to_string(),
            schema: "PUBLIC".to_string(),
            warehouse: None,
            stream_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
        };
        let relay = EventStreamRelay::new(
            UpstreamClient::new(&config)?,
            filter,
            config.stream_timeout,
        );
        Ok(Self {
            server,
            relay: Arc::new(relay),
        })
    }

    async fn respond_with(&self, template: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(AGENT_PATH))
            .respond_with(template)
            .mount(&self.server)
            .await;
    }
}

fn request() -> AgentRequest {
    AgentRequest::new(vec![json!({
        "role": "user",
        "content": [{"type": "text", "text": "How many orders shipped last week?"}]
    })])
}

#[tokio::test]
async fn test_relay_filters_sql_from_events() -> Result<()> {
    let harness = RelayHarness::new(FieldFilter::new(["sql"], true)).await?;
    let upstream_body = concat!(
        "event: response.status\n",
        "data: {\"status\":\"planning\"}\n",
        "\n",
        "event: response.tool_result\n",
        "data: {\"content\":[{\"json\":{\"sql\":\"SELECT * FROM orders\",\"text\":\"42 rows\"}}]}\n",
        "\n",
        "data: [DONE]\n",
    );
    harness
        .respond_with(ResponseTemplate::new(200).set_body_raw(upstream_body, "text/event-stream"))
        .await;

    let stream = harness.relay.start(&request()).await?;
    let relayed: String = stream.collect::<Vec<_>>().await.concat();

    assert_eq!(
        relayed,
        concat!(
            "event: response.status\n",
            "data: {\"status\":\"planning\"}\n",
            "\n",
            "event: response.tool_result\n",
            "data: {\"content\":[{\"json\":{\"text\":\"42 rows\"}}]}\n",
            "\n",
            "data: [DONE]\n",
        )
    );
    assert!(!relayed.contains("SELECT"));
    Ok(())
}

#[tokio::test]
async fn test_relay_forwards_request_body() -> Result<()> {
    let harness = RelayHarness::new(FieldFilter::disabled()).await?;
    let mut request = request();
    request.thread_id = Some(7);

    Mock::given(method("POST"))
        .and(path(AGENT_PATH))
        .and(header("Authorization", "Bearer pat-test"))
        .and(body_json(json!({
            "thread_id": 7,
            "messages": request.messages.clone()
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw("\n", "text/event-stream"))
        .expect(1)
        .mount(&harness.server)
        .await;

    let stream = harness.relay.start(&request).await?;
    assert_eq!(stream.collect::<Vec<_>>().await, vec!["\n".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_rejected_request_streams_nothing() -> Result<()> {
    let harness = RelayHarness::new(FieldFilter::new(["sql"], true)).await?;
    harness
        .respond_with(ResponseTemplate::new(500).set_body_string("{\"message\":\"internal\"}"))
        .await;

    match harness.relay.start(&request()).await {
        Err(RelayError::UpstreamRejected { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "{\"message\":\"internal\"}");
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("a rejected request must not produce a stream"),
    }
    Ok(())
}

#[tokio::test]
async fn test_dropping_the_client_releases_the_relay() -> Result<()> {
    let harness = RelayHarness::new(FieldFilter::disabled()).await?;
    harness
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("event: a\n\n", "text/event-stream")
                .set_delay(Duration::from_millis(10)),
        )
        .await;

    let stream = harness.relay.start(&request()).await?;
    drop(stream);

    // The spawned task holds the only other strong reference.
    tokio::time::timeout(Duration::from_secs(5), async {
        while Arc::strong_count(&harness.relay) > 1 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await?;
    Ok(())
}
