use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cortex_relay::errors::RelayError;
use serde_json::json;
use thiserror::Error;

const ENV_PREFIX: &str = "CORTEX";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },
    #[error("Invalid value {value:?} for {env_var}")]
    InvalidValue { env_var: String, value: String },
    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Map a config key such as `session.secret_key` to the environment
/// variable that sets it.
pub fn to_env_var(field: &str) -> String {
    let field = field.trim_matches('`').to_uppercase().replace('.', "__");
    format!("{}_{}", ENV_PREFIX, field)
}

/// Errors returned by route handlers before any response body is committed.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not authenticated")]
    Unauthenticated,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error(transparent)]
    Relay(#[from] RelayError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            ApiError::Unauthenticated | ApiError::Relay(RelayError::Unauthenticated) => {
                (StatusCode::UNAUTHORIZED, "Not authenticated".to_string())
            }
            ApiError::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Relay(RelayError::UpstreamRejected { status, .. }) => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
                self.to_string(),
            ),
            ApiError::Relay(RelayError::UpstreamUnavailable(_)) => (
                StatusCode::BAD_GATEWAY,
                "Cortex API is unavailable".to_string(),
            ),
            ApiError::Relay(RelayError::InvalidRequest(msg)) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            ApiError::Relay(_) | ApiError::Internal(_) => {
                tracing::error!("request failed: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_env_var() {
        assert_eq!(to_env_var("secret_key"), "CORTEX_SECRET_KEY");
        assert_eq!(
            to_env_var("session.secret_key"),
            "CORTEX_SESSION__SECRET_KEY"
        );
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (ApiError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (
                ApiError::from(RelayError::UpstreamRejected {
                    status: 429,
                    body: "slow down".to_string(),
                }),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                ApiError::from(RelayError::UpstreamUnavailable("refused".to_string())),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ApiError::Internal("boom".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
