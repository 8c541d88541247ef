use std::sync::Arc;

use super::cookie::{self, SessionCookie};
use super::token::TokenCodec;
use crate::errors::{RelayError, RelayResult};

/// Turns the credential slot of an inbound request into an identity.
///
/// Missing, tampered and expired credentials all collapse into
/// `RelayError::Unauthenticated`.
pub struct SessionGuard {
    codec: Arc<TokenCodec>,
    cookie: SessionCookie,
}

impl SessionGuard {
    pub fn new(codec: Arc<TokenCodec>, cookie: SessionCookie) -> Self {
        Self { codec, cookie }
    }

    /// Authenticate from the raw `Cookie` header, if the request had one.
    pub fn authenticate(&self, cookie_header: Option<&str>) -> RelayResult<String> {
        let token = cookie_header
            .and_then(|header| cookie::extract(header, self.cookie.name()))
            .ok_or(RelayError::Unauthenticated)?;
        self.verify(token)
    }

    /// Authenticate a credential value that was already pulled out of its slot.
    pub fn verify(&self, token: &str) -> RelayResult<String> {
        self.codec
            .verify(token, self.cookie.max_age())
            .map_err(|e| {
                tracing::debug!("rejected session credential: {}", e);
                RelayError::Unauthenticated
            })
    }
}
