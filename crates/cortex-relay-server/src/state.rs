use anyhow::Result;
use cortex_relay::{
    relay::{EventStreamRelay, FieldFilter},
    session::{SessionCookie, SessionGuard, TokenCodec},
    upstream::{CredentialVerifier, SqlApiVerifier, UpstreamClient},
};
use std::sync::Arc;

use crate::configuration::Settings;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub codec: Arc<TokenCodec>,
    pub guard: Arc<SessionGuard>,
    pub cookie: SessionCookie,
    pub relay: Arc<EventStreamRelay>,
    pub verifier: Arc<dyn CredentialVerifier>,
}

impl AppState {
    pub fn new(
        codec: Arc<TokenCodec>,
        cookie: SessionCookie,
        relay: EventStreamRelay,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Self {
        let guard = Arc::new(SessionGuard::new(codec.clone(), cookie.clone()));
        Self {
            codec,
            guard,
            cookie,
            relay: Arc::new(relay),
            verifier,
        }
    }

    /// Wire every component from settings. Runs once at startup.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let codec = Arc::new(TokenCodec::new(settings.session.secret_key.as_bytes())?);
        let cookie = SessionCookie::new(
            settings.session.cookie_name.clone(),
            settings.session.max_age(),
        );

        let filter = FieldFilter::new(
            settings.filter.blocked_keys(),
            settings.filter.remove_sql,
        );
        let upstream = settings.upstream.into_config();
        let relay = EventStreamRelay::new(
            UpstreamClient::new(&upstream)?,
            filter,
            upstream.stream_timeout,
        );
        let verifier = Arc::new(SqlApiVerifier::new(&upstream)?);

        Ok(Self::new(codec, cookie, relay, verifier))
    }
}
