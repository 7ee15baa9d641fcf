//! Session abstraction.
//!
//! The broker client itself is an external collaborator: the SDK only
//! needs to build a session from canonical properties, push a fresh
//! bearer token into it and open it. [`crate::nats`] provides the NATS
//! implementation.

use std::sync::Arc;

use async_trait::async_trait;
use brokerlink_models::ConnectionProperties;

use crate::error::SdkError;
use crate::handler::SessionEventHandler;

/// A broker session built from [`ConnectionProperties`].
#[async_trait]
pub trait Session: Send + Sync {
    /// Snapshot of the properties the session runs with, including the
    /// current access token.
    fn properties(&self) -> ConnectionProperties;

    /// Current bearer token, if any.
    fn access_token(&self) -> Option<String> {
        self.properties().oauth2_access_token
    }

    /// Replace the bearer token presented on the next (re)connect.
    fn set_access_token(&self, token: String) -> Result<(), SdkError>;

    /// Open the session. Retries are the underlying client's concern.
    async fn connect(&self) -> Result<(), SdkError>;

    /// Whether the session currently has a live connection.
    fn is_connected(&self) -> bool;
}

/// Constructs sessions without connecting them.
pub trait SessionBuilder: Send + Sync {
    /// Build a session that reports lifecycle events to `handler`.
    fn build(
        &self,
        properties: ConnectionProperties,
        handler: Arc<dyn SessionEventHandler>,
    ) -> Result<Arc<dyn Session>, SdkError>;
}
