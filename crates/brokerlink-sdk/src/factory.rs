//! Session construction.

use std::sync::Arc;

use brokerlink_models::{AuthenticationScheme, ConnectionProperties};
use tracing::{debug, info};

use crate::error::SdkError;
use crate::handler::{NoopEventHandler, ReconnectEventHandler, SessionEventHandler};
use crate::session::{Session, SessionBuilder};
use crate::token::TokenProvider;

/// Builds sessions from one resolved set of [`ConnectionProperties`].
///
/// On the OAuth2 path the factory fetches the initial token before the
/// session exists and wires the session back into its reconnect handler,
/// so every later reconnect presents a fresh token.
pub struct ConnectionFactory {
    properties: ConnectionProperties,
    token_provider: Option<Arc<dyn TokenProvider>>,
    session_builder: Arc<dyn SessionBuilder>,
}

impl ConnectionFactory {
    /// Create a factory without a token provider.
    pub fn new(properties: ConnectionProperties, session_builder: Arc<dyn SessionBuilder>) -> Self {
        Self {
            properties,
            token_provider: None,
            session_builder,
        }
    }

    /// Attach the token provider used for OAuth2.
    #[must_use]
    pub fn with_token_provider(mut self, token_provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = Some(token_provider);
        self
    }

    /// Properties sessions are built from.
    pub fn properties(&self) -> &ConnectionProperties {
        &self.properties
    }

    /// Build a session. The session is not connected yet.
    ///
    /// Without a handler, non-OAuth2 sessions get a logging no-op handler and
    /// OAuth2 sessions get a [`ReconnectEventHandler`]. A handler supplied
    /// for an OAuth2 session must expose
    /// [`as_oauth2`](SessionEventHandler::as_oauth2).
    ///
    /// # Errors
    ///
    /// [`SdkError::Config`] when OAuth2 is configured without a token
    /// provider or with an incapable handler; any error of the initial token
    /// fetch, in which case no session is built.
    pub async fn create_session(
        &self,
        handler: Option<Arc<dyn SessionEventHandler>>,
    ) -> Result<Arc<dyn Session>, SdkError> {
        match self.properties.authentication_scheme {
            AuthenticationScheme::OAuth2 => self.create_oauth2_session(handler).await,
            AuthenticationScheme::None
            | AuthenticationScheme::Basic
            | AuthenticationScheme::ClientCertificate
            | AuthenticationScheme::Kerberos => {
                let handler: Arc<dyn SessionEventHandler> = match handler {
                    Some(handler) => handler,
                    None => Arc::new(NoopEventHandler),
                };
                debug!(scheme = %self.properties.authentication_scheme, "building session");
                self.session_builder.build(self.properties.clone(), handler)
            }
        }
    }

    async fn create_oauth2_session(
        &self,
        handler: Option<Arc<dyn SessionEventHandler>>,
    ) -> Result<Arc<dyn Session>, SdkError> {
        let provider = self.token_provider.clone().ok_or_else(|| {
            SdkError::Config("OAuth2 authentication requires a token provider".into())
        })?;

        let handler: Arc<dyn SessionEventHandler> = match handler {
            Some(handler) if handler.as_oauth2().is_some() => handler,
            Some(_) => {
                return Err(SdkError::Config(
                    "OAuth2 sessions need an event handler that can refresh tokens".into(),
                ))
            }
            None => Arc::new(ReconnectEventHandler::new(
                &self.properties,
                Some(Arc::clone(&provider)),
            )?),
        };

        let token = provider.access_token().await?;
        let properties = self.properties.clone().with_access_token(token);
        let session = self.session_builder.build(properties, Arc::clone(&handler))?;

        handler
            .as_oauth2()
            .ok_or_else(|| SdkError::Config("event handler lost its OAuth2 capability".into()))?
            .bind_session(Arc::downgrade(&session))?;

        info!(
            registration_id = ?self.properties.oauth2_client_registration_id,
            "OAuth2 session built"
        );
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::PropertyResolver;
    use crate::testing::{FakeSessionBuilder, ScriptedTokenProvider};
    use brokerlink_models::{LocalProperties, ReconnectEvent};

    fn properties(scheme: AuthenticationScheme) -> ConnectionProperties {
        let mut local = LocalProperties::default();
        local.authentication_scheme = scheme;
        local.oauth2_client_registration_id = Some("my-oauth2-client".into());
        PropertyResolver::resolve(&local, None)
    }

    #[tokio::test]
    async fn basic_session_uses_properties_as_is() {
        let builder = FakeSessionBuilder::new();
        let factory = ConnectionFactory::new(properties(AuthenticationScheme::Basic), builder.clone());

        let session = factory.create_session(None).await.unwrap();
        assert_eq!(builder.builds(), 1);
        assert!(session.access_token().is_none());
        assert_eq!(&session.properties(), factory.properties());
        assert!(builder.last().handler.as_oauth2().is_none());
    }

    #[tokio::test]
    async fn oauth2_without_provider_fails_before_any_fetch() {
        let builder = FakeSessionBuilder::new();
        let factory = ConnectionFactory::new(properties(AuthenticationScheme::OAuth2), builder.clone());

        let err = factory.create_session(None).await.err().unwrap();
        assert!(matches!(err, SdkError::Config(_)));
        assert_eq!(builder.builds(), 0);
    }

    #[tokio::test]
    async fn oauth2_rejects_incapable_handler() {
        let provider = ScriptedTokenProvider::new([Ok("T0")]);
        let builder = FakeSessionBuilder::new();
        let factory = ConnectionFactory::new(properties(AuthenticationScheme::OAuth2), builder.clone())
            .with_token_provider(provider.clone());

        let err = factory
            .create_session(Some(Arc::new(NoopEventHandler)))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, SdkError::Config(_)));
        assert_eq!(provider.calls(), 0);
        assert_eq!(builder.builds(), 0);
    }

    #[tokio::test]
    async fn oauth2_injects_token_and_binds_handler() {
        let provider = ScriptedTokenProvider::new([Ok("T0"), Ok("T1")]);
        let builder = FakeSessionBuilder::new();
        let factory = ConnectionFactory::new(properties(AuthenticationScheme::OAuth2), builder.clone())
            .with_token_provider(provider.clone());

        let session = factory.create_session(None).await.unwrap();
        assert_eq!(session.access_token().as_deref(), Some("T0"));
        assert!(factory.properties().oauth2_access_token.is_none());

        builder
            .last()
            .handler
            .handle_event(ReconnectEvent::reconnecting("link lost"))
            .await;
        assert_eq!(session.access_token().as_deref(), Some("T1"));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn oauth2_accepts_caller_handler_and_binds_it() {
        let provider = ScriptedTokenProvider::new([Ok("T0")]);
        let props = properties(AuthenticationScheme::OAuth2);
        let handler = Arc::new(ReconnectEventHandler::new(&props, Some(provider.clone())).unwrap());
        let factory = ConnectionFactory::new(props, FakeSessionBuilder::new())
            .with_token_provider(provider.clone());

        factory.create_session(Some(handler.clone())).await.unwrap();
        assert!(handler.is_bound());
    }

    #[tokio::test]
    async fn initial_auth_failure_builds_nothing() {
        let provider = ScriptedTokenProvider::new([Err("invalid_client")]);
        let builder = FakeSessionBuilder::new();
        let factory = ConnectionFactory::new(properties(AuthenticationScheme::OAuth2), builder.clone())
            .with_token_provider(provider);

        let err = factory.create_session(None).await.err().unwrap();
        assert!(err.is_auth());
        assert_eq!(builder.builds(), 0);
    }
}
