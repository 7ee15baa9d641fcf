//! Session lifecycle event handling.
//!
//! A session reports [`ReconnectEvent`]s to its [`SessionEventHandler`].
//! For OAuth2 sessions the [`ReconnectEventHandler`] fetches a fresh bearer
//! token on every reconnect attempt and pushes it into the session, so the
//! next handshake presents a valid token.
//!
//! ```text
//!            RECONNECTING (OAuth2)
//!   Idle ───────────────────────────▶ Refreshing
//!    ▲                                    │
//!    └──────── success or failure ────────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use async_trait::async_trait;
use brokerlink_models::{AuthenticationScheme, ConnectionProperties, ReconnectEvent, SessionEventKind};
use tracing::{debug, info, warn};

use crate::error::SdkError;
use crate::session::Session;
use crate::token::TokenProvider;

/// Receives the lifecycle events of one session.
#[async_trait]
pub trait SessionEventHandler: Send + Sync {
    /// Handle one event. Events of a session are delivered in order.
    async fn handle_event(&self, event: ReconnectEvent);

    /// The OAuth2 refresh capability, if this handler has it.
    fn as_oauth2(&self) -> Option<&dyn OAuth2SessionEventHandler> {
        None
    }
}

/// A handler that can refresh the bearer token of the session it is bound to.
pub trait OAuth2SessionEventHandler: SessionEventHandler {
    /// Bind the session whose token gets refreshed.
    ///
    /// The reference is non-owning and can be set once; a second bind is a
    /// configuration error.
    fn bind_session(&self, session: Weak<dyn Session>) -> Result<(), SdkError>;
}

/// Handler used when the caller supplies none: logs and does nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventHandler;

#[async_trait]
impl SessionEventHandler for NoopEventHandler {
    async fn handle_event(&self, event: ReconnectEvent) {
        debug!(kind = %event.kind, info = %event.info, "session event");
    }
}

/// Refresh state of a [`ReconnectEventHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    /// Waiting for events.
    Idle,
    /// Fetching and pushing a new token.
    Refreshing,
}

/// Refreshes the session's bearer token on every reconnect attempt.
///
/// Refresh failures are logged and swallowed: the underlying client keeps
/// retrying with whatever token the session holds.
pub struct ReconnectEventHandler {
    scheme: AuthenticationScheme,
    token_provider: Option<Arc<dyn TokenProvider>>,
    session: OnceLock<Weak<dyn Session>>,
    refreshing: AtomicBool,
}

impl ReconnectEventHandler {
    /// Create a handler for sessions built from `properties`.
    ///
    /// OAuth2 requires a token provider.
    pub fn new(
        properties: &ConnectionProperties,
        token_provider: Option<Arc<dyn TokenProvider>>,
    ) -> Result<Self, SdkError> {
        if properties.authentication_scheme.is_oauth2() && token_provider.is_none() {
            return Err(SdkError::Config(
                "OAuth2 reconnect handling requires a token provider".into(),
            ));
        }
        Ok(Self {
            scheme: properties.authentication_scheme,
            token_provider,
            session: OnceLock::new(),
            refreshing: AtomicBool::new(false),
        })
    }

    /// Current refresh state.
    pub fn state(&self) -> HandlerState {
        if self.refreshing.load(Ordering::Acquire) {
            HandlerState::Refreshing
        } else {
            HandlerState::Idle
        }
    }

    /// Whether a session has been bound.
    pub fn is_bound(&self) -> bool {
        self.session.get().is_some()
    }

    async fn refresh(&self) -> Result<(), SdkError> {
        let provider = self
            .token_provider
            .as_ref()
            .ok_or_else(|| SdkError::Config("no token provider".into()))?;
        let token = provider.access_token().await?;

        let session = self
            .session
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| SdkError::Session("no live session bound to the handler".into()))?;
        session.set_access_token(token)
    }
}

#[async_trait]
impl SessionEventHandler for ReconnectEventHandler {
    async fn handle_event(&self, event: ReconnectEvent) {
        if event.kind != SessionEventKind::Reconnecting || !self.scheme.is_oauth2() {
            debug!(kind = %event.kind, info = %event.info, "session event");
            return;
        }

        info!(info = %event.info, "session reconnecting, refreshing OAuth2 access token");
        self.refreshing.store(true, Ordering::Release);
        let outcome = self.refresh().await;
        self.refreshing.store(false, Ordering::Release);

        match outcome {
            Ok(()) => debug!("pushed refreshed access token into the session"),
            Err(e) => warn!(error = %e, "failed to refresh OAuth2 access token"),
        }
    }

    fn as_oauth2(&self) -> Option<&dyn OAuth2SessionEventHandler> {
        Some(self)
    }
}

impl OAuth2SessionEventHandler for ReconnectEventHandler {
    fn bind_session(&self, session: Weak<dyn Session>) -> Result<(), SdkError> {
        self.session
            .set(session)
            .map_err(|_| SdkError::Config("handler is already bound to a session".into()))
    }
}
