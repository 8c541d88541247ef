use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Source of the current time, injectable so expiry can be tested.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Why a token was refused. Callers outside this crate only ever see
/// `RelayError::Unauthenticated`; the distinction exists for logging.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("signing key must not be empty")]
    InvalidKey,
    #[error("token is malformed")]
    Malformed,
    #[error("token signature does not match")]
    BadSignature,
    #[error("token has expired")]
    Expired,
}

/// The claims carried inside a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    #[serde(rename = "sub")]
    pub identity: String,
    #[serde(rename = "iat")]
    pub issued_at: i64,
}

/// Issues and verifies signed, expiring session tokens.
///
/// A token is `base64url(claims).base64url(hmac_sha256(secret, base64url(claims)))`.
/// There is no server-side state, so a token stays valid until it ages out;
/// individual sessions cannot be revoked early.
pub struct TokenCodec {
    mac: HmacSha256,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, TokenError> {
        Self::with_clock(secret, Arc::new(SystemClock))
    }

    pub fn with_clock(secret: impl AsRef<[u8]>, clock: Arc<dyn Clock>) -> Result<Self, TokenError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(TokenError::InvalidKey);
        }
        let mac = HmacSha256::new_from_slice(secret).map_err(|_| TokenError::InvalidKey)?;
        Ok(Self { mac, clock })
    }

    /// Sign `identity` together with the current time.
    pub fn issue(&self, identity: &str) -> String {
        let claims = json!({
            "sub": identity,
            "iat": self.clock.now().timestamp(),
        });
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        let signature = URL_SAFE_NO_PAD.encode(self.sign(payload.as_bytes()));
        format!("{}.{}", payload, signature)
    }

    /// Check the signature, then the age, and return the embedded identity.
    ///
    /// The claims are not decoded until the signature has been verified.
    pub fn verify(&self, token: &str, max_age: Duration) -> Result<String, TokenError> {
        let (payload, signature) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;

        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::Malformed)?;
        let claims: SessionToken =
            serde_json::from_slice(&claims).map_err(|_| TokenError::Malformed)?;

        let age = self.clock.now().timestamp() - claims.issued_at;
        // A negative age means the token claims to come from the future.
        if age < 0 || age as u64 > max_age.as_secs() {
            return Err(TokenError::Expired);
        }

        Ok(claims.identity)
    }

    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}
