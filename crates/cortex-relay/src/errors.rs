use thiserror::Error;

/// Failures a relay or guard invocation can surface to its caller.
///
/// Everything except `UpstreamStreamFailed` is resolved before any response
/// bytes are committed. A mid-stream failure only ever reaches the client as a
/// terminal in-band `error` event.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Cortex API error: {body}")]
    UpstreamRejected { status: u16, body: String },

    #[error("Upstream request failed: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream stream failed: {0}")]
    UpstreamStreamFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

pub type RelayResult<T> = Result<T, RelayError>;
