use anyhow::{anyhow, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde_json::{json, Value};

use super::configs::UpstreamConfig;

/// Checks a username/password pair during login.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// `Ok(Some(identity))` when the pair is valid, `Ok(None)` when it is not.
    async fn authenticate_credentials(&self, identity: &str, secret: &str)
        -> Result<Option<String>>;
}

/// Looks credentials up in a `users` table through the SQL statements API.
pub struct SqlApiVerifier {
    client: Client,
    endpoint: String,
    auth_header: String,
    statement: String,
    warehouse: Option<String>,
}

impl SqlApiVerifier {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        // Database and schema are spliced into the statement, so they must be
        // plain identifiers. User input only ever travels as bindings.
        let identifier = Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$")?;
        for (label, value) in [("database", &config.database), ("schema", &config.schema)] {
            if !identifier.is_match(value) {
                return Err(anyhow!("Invalid {} identifier: {:?}", label, value));
            }
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.sql_endpoint.clone(),
            auth_header: config.bearer(),
            statement: format!(
                "SELECT userid FROM {}.{}.users WHERE userid = ? AND password = ?",
                config.database, config.schema
            ),
            warehouse: config.warehouse.clone(),
        })
    }

    fn payload(&self, identity: &str, secret: &str) -> Value {
        let mut payload = json!({
            "statement": self.statement,
            "bindings": {
                "1": { "type": "TEXT", "value": identity },
                "2": { "type": "TEXT", "value": secret },
            },
        });
        if let Some(warehouse) = &self.warehouse {
            payload["warehouse"] = json!(warehouse);
        }
        payload
    }
}

#[async_trait]
impl CredentialVerifier for SqlApiVerifier {
    async fn authenticate_credentials(
        &self,
        identity: &str,
        secret: &str,
    ) -> Result<Option<String>> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, &self.auth_header)
            .header(ACCEPT, "application/json")
            .json(&self.payload(identity, secret))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let err_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("SQL API request failed: {}: {}", status, err_text));
        }

        let result: Value = response.json().await?;
        let rows = result
            .get("data")
            .and_then(|data| data.as_array())
            .map(|rows| rows.len())
            .unwrap_or(0);

        Ok((rows == 1).then(|| identity.to_string()))
    }
}
