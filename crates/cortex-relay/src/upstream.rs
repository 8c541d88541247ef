pub mod client;
pub mod configs;
pub mod credentials;

pub use client::{LineStream, UpstreamClient};
pub use configs::UpstreamConfig;
pub use credentials::{CredentialVerifier, SqlApiVerifier};
