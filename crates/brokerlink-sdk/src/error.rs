//! SDK error types.
//!
//! [`SdkError`] is the single error type returned by every fallible
//! operation in the SDK. Misconfiguration surfaces as
//! [`SdkError::Config`] at construction time; token acquisition failures
//! surface as [`SdkError::Auth`] or [`SdkError::Authorization`].

use brokerlink_models::ModelError;

/// Error type for all SDK operations.
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    /// Invalid or missing configuration (e.g. OAuth2 without a token provider).
    #[error("configuration error: {0}")]
    Config(String),

    /// The identity provider rejected the client or returned no token.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The authorization manager could not authorize the client.
    #[error("authorization failed: {0}")]
    Authorization(String),

    /// A looked-up resource (e.g. a service id) does not exist.
    #[error("missing resource: {0}")]
    MissingResource(String),

    /// The session could not be driven (not connected, already dropped, ...).
    #[error("session error: {0}")]
    Session(String),

    /// NATS transport error.
    #[error("NATS error: {0}")]
    Nats(String),

    /// HTTP request failure while talking to the token endpoint.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization / deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid model value.
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl SdkError {
    /// `true` for failures to obtain a token ([`Self::Auth`] / [`Self::Authorization`]).
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::Authorization(_))
    }
}

impl From<async_nats::ConnectError> for SdkError {
    fn from(e: async_nats::ConnectError) -> Self {
        SdkError::Nats(e.to_string())
    }
}
