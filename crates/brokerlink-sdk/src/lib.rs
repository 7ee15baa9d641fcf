//! # brokerlink SDK
//!
//! Decides the parameters a messaging-broker session is opened with and
//! keeps its OAuth2 bearer token fresh across reconnects.
//!
//! The SDK provides:
//!
//! * [`CredentialSource`]: discovered broker services
//!   ([`VcapCredentialSource`] reads a Cloud-Foundry `VCAP_SERVICES`
//!   document, [`StaticCredentialSource`] holds a fixed list).
//! * [`PropertyResolver`]: merges discovered credentials with local
//!   defaults into canonical [`ConnectionProperties`].
//! * [`TokenProvider`] / [`OAuth2TokenProvider`]: bearer tokens from an
//!   [`AuthorizationManager`] such as [`HttpAuthorizationManager`].
//! * [`ReconnectEventHandler`]: refreshes the token on every reconnect.
//! * [`ConnectionFactory`]: builds sessions, wiring the above together.
//! * [`ServiceConnector`]: the multi-service front door.
//! * [`NatsSessionBuilder`]: sessions over NATS.
//! * [`SdkError`]: unified error type for all SDK operations.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use brokerlink_sdk::{NatsSessionBuilder, SdkConfig, ServiceConnector, VcapCredentialSource};
//!
//! # async fn run() -> Result<(), brokerlink_sdk::SdkError> {
//! let config = SdkConfig::from_env()?;
//! let connector = ServiceConnector::new(
//!     config.local,
//!     Arc::new(VcapCredentialSource::from_env()),
//!     Arc::new(NatsSessionBuilder),
//! );
//!
//! let session = connector.factory()?.create_session(None).await?;
//! session.connect().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connector;
pub mod credentials;
pub mod error;
pub mod factory;
pub mod handler;
pub mod nats;
pub mod oauth;
pub mod resolver;
pub mod session;
pub mod token;

#[cfg(test)]
mod testing;

pub use config::SdkConfig;
pub use connector::ServiceConnector;
pub use credentials::{CredentialSource, StaticCredentialSource, VcapCredentialSource};
pub use error::SdkError;
pub use factory::ConnectionFactory;
pub use handler::{
    HandlerState, NoopEventHandler, OAuth2SessionEventHandler, ReconnectEventHandler,
    SessionEventHandler,
};
pub use nats::{NatsSession, NatsSessionBuilder};
pub use oauth::{
    AccessToken, AuthorizationManager, AuthorizeRequest, AuthorizedClient, ClientRegistration,
    GrantType, HttpAuthorizationManager,
};
pub use resolver::PropertyResolver;
pub use session::{Session, SessionBuilder};
pub use token::{OAuth2TokenProvider, TokenProvider};

// Re-export the data model for ergonomic usage.
pub use brokerlink_models::{
    AuthenticationScheme, ConnectionProperties, Credentials, JndiProperties, LocalProperties,
    ReconnectEvent, SessionEventKind,
};
