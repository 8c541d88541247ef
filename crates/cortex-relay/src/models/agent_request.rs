use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::errors::{RelayError, RelayResult};

/// Body accepted by the agent run endpoint and forwarded upstream.
///
/// Messages are opaque: the relay never inspects them. Optional fields are
/// omitted from the forwarded body when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_message_id: Option<i64>,
    pub messages: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Map<String, Value>>,
}

impl AgentRequest {
    pub fn new(messages: Vec<Value>) -> Self {
        Self {
            thread_id: None,
            parent_message_id: None,
            messages,
            tool_choice: None,
        }
    }

    pub fn to_value(&self) -> RelayResult<Value> {
        serde_json::to_value(self).map_err(|e| RelayError::InvalidRequest(e.to_string()))
    }
}

/// Hook applied to the outbound body right before it is dispatched upstream.
pub type RequestTransform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// The default hook: forwards the body as-is.
pub fn passthrough() -> RequestTransform {
    Arc::new(|body| body)
}
