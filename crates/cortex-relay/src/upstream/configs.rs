use std::time::Duration;

/// Where and how to reach the remote agent and SQL APIs.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub pat_token: String,
    pub agent_endpoint: String,
    pub sql_endpoint: String,
    pub database: String,
    pub schema: String,
    pub warehouse: Option<String>,
    /// Bound on a whole streaming exchange, headers through last byte.
    pub stream_timeout: Duration,
    /// Bound on short request/response calls such as the login lookup.
    pub request_timeout: Duration,
}

impl UpstreamConfig {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.pat_token)
    }
}
