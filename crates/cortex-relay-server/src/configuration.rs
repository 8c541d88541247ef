use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment};
use cortex_relay::upstream::UpstreamConfig;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                env_var: to_env_var("server.host"),
                value: self.host.clone(),
            })
    }

    pub fn cors_origins(&self) -> Vec<String> {
        split_list(&self.cors_origins)
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionSettings {
    pub secret_key: String,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

impl SessionSettings {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpstreamSettings {
    pub pat_token: String,
    pub agent_endpoint: String,
    pub sql_endpoint: String,
    pub database: String,
    pub schema: String,
    #[serde(default)]
    pub warehouse: Option<String>,
    #[serde(default = "default_stream_timeout_secs")]
    pub stream_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl UpstreamSettings {
    // Convert to the core UpstreamConfig
    pub fn into_config(self) -> UpstreamConfig {
        UpstreamConfig {
            pat_token: self.pat_token,
            agent_endpoint: self.agent_endpoint,
            sql_endpoint: self.sql_endpoint,
            database: self.database,
            schema: self.schema,
            warehouse: self.warehouse.filter(|w| !w.is_empty()),
            stream_timeout: Duration::from_secs(self.stream_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FilterSettings {
    #[serde(default)]
    pub remove_sql: bool,
    #[serde(default = "default_blocked_keys")]
    pub blocked_keys: String,
}

impl FilterSettings {
    pub fn blocked_keys(&self) -> Vec<String> {
        split_list(&self.blocked_keys)
    }
}

#[derive(Debug)]
pub struct Settings {
    pub server: ServerSettings,
    pub session: SessionSettings,
    pub upstream: UpstreamSettings,
    pub filter: FilterSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        // Start with default configuration
        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .set_default("server.cors_origins", default_cors_origins())?
            .set_default("session.cookie_name", default_cookie_name())?
            .set_default("session.max_age_secs", default_max_age_secs())?
            .set_default("upstream.stream_timeout_secs", default_stream_timeout_secs())?
            .set_default("upstream.request_timeout_secs", default_request_timeout_secs())?
            .set_default("filter.remove_sql", false)?
            .set_default("filter.blocked_keys", default_blocked_keys())?
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("CORTEX")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        // Each section is read on its own so a missing key can be reported
        // with its full path.
        let settings = Settings {
            server: section(&config, "server")?,
            session: section(&config, "session")?,
            upstream: section(&config, "upstream")?,
            filter: section(&config, "filter")?,
        };
        settings.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.session.secret_key.is_empty() {
            return Err(ConfigError::MissingEnvVar {
                env_var: to_env_var("session.secret_key"),
            });
        }
        Ok(self)
    }
}

fn section<T: DeserializeOwned>(config: &Config, name: &str) -> Result<T, ConfigError> {
    config.get::<T>(name).map_err(|err| {
        tracing::debug!("Configuration error in {}: {:?}", name, &err);

        // serde reports "missing field `name`" without the section; config
        // reports NotFound(key) with the full key
        let message = err.to_string();
        if message.contains("missing field") {
            let field = message.split('`').nth(1).unwrap_or_default();
            ConfigError::MissingEnvVar {
                env_var: to_env_var(&format!("{}.{}", name, field)),
            }
        } else if let config::ConfigError::NotFound(key) = &err {
            ConfigError::MissingEnvVar {
                env_var: to_env_var(key),
            }
        } else {
            ConfigError::Other(err)
        }
    })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> String {
    "http://localhost:3000,http://localhost:5173".to_string()
}

fn default_cookie_name() -> String {
    "cortex_agent_session".to_string()
}

fn default_max_age_secs() -> u64 {
    86_400
}

fn default_stream_timeout_secs() -> u64 {
    300
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_blocked_keys() -> String {
    "sql".to_string()
}
