//! Front door for applications bound to one or more broker services.

use std::sync::Arc;

use brokerlink_models::{AuthenticationScheme, ConnectionProperties, Credentials, JndiProperties, LocalProperties};
use tracing::debug;

use crate::credentials::CredentialSource;
use crate::error::SdkError;
use crate::factory::ConnectionFactory;
use crate::oauth::AuthorizationManager;
use crate::resolver::PropertyResolver;
use crate::session::SessionBuilder;
use crate::token::OAuth2TokenProvider;

/// Resolves properties and builds connection factories for discovered
/// services.
///
/// The no-argument variants use the first discovered service, or the local
/// defaults when nothing was discovered.
pub struct ServiceConnector {
    local: LocalProperties,
    source: Arc<dyn CredentialSource>,
    session_builder: Arc<dyn SessionBuilder>,
    authorization_manager: Option<Arc<dyn AuthorizationManager>>,
}

impl ServiceConnector {
    /// Create a connector.
    pub fn new(
        local: LocalProperties,
        source: Arc<dyn CredentialSource>,
        session_builder: Arc<dyn SessionBuilder>,
    ) -> Self {
        Self {
            local,
            source,
            session_builder,
            authorization_manager: None,
        }
    }

    /// Authorization manager backing OAuth2 token providers.
    #[must_use]
    pub fn with_authorization_manager(mut self, manager: Arc<dyn AuthorizationManager>) -> Self {
        self.authorization_manager = Some(manager);
        self
    }

    /// Local defaults.
    pub fn local(&self) -> &LocalProperties {
        &self.local
    }

    /// Credentials of every discovered service.
    pub fn credentials(&self) -> Vec<Credentials> {
        self.source.list_all()
    }

    /// First discovered service.
    pub fn find_first(&self) -> Option<Credentials> {
        self.source.find_first()
    }

    /// Discovered service with the given id.
    pub fn find_by_id(&self, id: &str) -> Option<Credentials> {
        self.source.find_by_id(id)
    }

    /// Properties for the first discovered service.
    pub fn properties(&self) -> ConnectionProperties {
        self.properties_with(self.find_first().as_ref())
    }

    /// Properties for the service with the given id.
    pub fn properties_for(&self, id: &str) -> Option<ConnectionProperties> {
        self.source
            .find_by_id(id)
            .map(|creds| self.properties_with(Some(&creds)))
    }

    /// Properties for explicit credentials.
    pub fn properties_with(&self, credentials: Option<&Credentials>) -> ConnectionProperties {
        PropertyResolver::resolve(&self.local, credentials)
    }

    /// JNDI lookup environment for the first discovered service.
    pub fn jndi_properties(&self) -> JndiProperties {
        self.jndi_properties_with(self.find_first().as_ref())
    }

    /// JNDI lookup environment for explicit credentials.
    pub fn jndi_properties_with(&self, credentials: Option<&Credentials>) -> JndiProperties {
        PropertyResolver::resolve_jndi(&self.local, credentials)
    }

    /// Factory for the first discovered service.
    pub fn factory(&self) -> Result<ConnectionFactory, SdkError> {
        self.factory_with(self.find_first().as_ref())
    }

    /// Factory for the service with the given id, `None` if unknown.
    pub fn factory_for(&self, id: &str) -> Result<Option<ConnectionFactory>, SdkError> {
        self.source
            .find_by_id(id)
            .map(|creds| self.factory_with(Some(&creds)))
            .transpose()
    }

    /// Factory for explicit credentials.
    ///
    /// OAuth2 factories get a token provider when an authorization manager
    /// is configured; without one, session creation fails with a
    /// configuration error.
    pub fn factory_with(&self, credentials: Option<&Credentials>) -> Result<ConnectionFactory, SdkError> {
        let properties = self.properties_with(credentials);
        debug!(
            service = credentials.map_or("<local>", |c| c.id.as_str()),
            host = %properties.host,
            "building connection factory"
        );

        let oauth2 = properties.authentication_scheme == AuthenticationScheme::OAuth2;
        let provider = match (&self.authorization_manager, oauth2) {
            (Some(manager), true) => Some(OAuth2TokenProvider::new(&properties, Arc::clone(manager))?),
            _ => None,
        };

        let factory = ConnectionFactory::new(properties, Arc::clone(&self.session_builder));
        Ok(match provider {
            Some(provider) => factory.with_token_provider(Arc::new(provider)),
            None => factory,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticCredentialSource;
    use crate::oauth::{AccessToken, AuthorizeRequest, AuthorizedClient};
    use crate::session::Session;
    use crate::testing::FakeSessionBuilder;
    use async_trait::async_trait;

    struct FixedManager;

    #[async_trait]
    impl AuthorizationManager for FixedManager {
        async fn authorize(&self, request: &AuthorizeRequest) -> Result<AuthorizedClient, SdkError> {
            Ok(AuthorizedClient {
                registration_id: request.registration_id.clone(),
                principal: request.principal.clone(),
                access_token: AccessToken {
                    value: format!("token-for-{}", request.principal),
                    expires_at: None,
                },
                refresh_token: None,
            })
        }
    }

    fn service(id: &str, vpn: &str, username: &str) -> Credentials {
        let mut creds = Credentials::new(id);
        creds.msg_vpn_name = Some(vpn.into());
        creds.client_username = Some(username.into());
        creds.endpoints.smf_hosts = Some(vec![format!("tcp://{id}.example.com:55555")]);
        creds
    }

    fn connector(services: Vec<Credentials>, local: LocalProperties) -> ServiceConnector {
        ServiceConnector::new(
            local,
            Arc::new(StaticCredentialSource::new(services)),
            FakeSessionBuilder::new(),
        )
    }

    #[test]
    fn no_services_means_local_defaults() {
        let connector = connector(Vec::new(), LocalProperties::default());
        assert!(connector.credentials().is_empty());
        assert!(connector.find_first().is_none());

        let props = connector.properties();
        assert_eq!(props.host, "localhost");
        assert_eq!(props.vpn, "default");
        assert!(connector.properties_for("anything").is_none());
        assert_eq!(connector.jndi_properties().provider_url, "localhost");
    }

    #[test]
    fn every_service_resolves_independently() {
        let connector = connector(
            vec![service("alpha", "vpn-a", "user-a"), service("beta", "vpn-b", "user-b")],
            LocalProperties::default(),
        );

        assert_eq!(connector.credentials().len(), 2);
        assert_eq!(connector.properties().vpn, "vpn-a");

        let beta = connector.properties_for("beta").unwrap();
        assert_eq!(beta.vpn, "vpn-b");
        assert_eq!(beta.username, "user-b");
        assert_eq!(beta.host, "tcp://beta.example.com:55555");

        assert_eq!(connector.properties_for("alpha").unwrap().vpn, "vpn-a");
    }

    #[test]
    fn factory_for_unknown_id_is_none() {
        let connector = connector(vec![service("alpha", "vpn-a", "user-a")], LocalProperties::default());
        assert!(connector.factory_for("gamma").unwrap().is_none());
        assert_eq!(
            connector.factory_for("alpha").unwrap().unwrap().properties().vpn,
            "vpn-a"
        );
    }

    #[tokio::test]
    async fn oauth2_factory_fetches_token_for_service_principal() {
        let mut local = LocalProperties::default();
        local.authentication_scheme = AuthenticationScheme::OAuth2;
        local.oauth2_client_registration_id = Some("my-oauth2-client".into());
        let connector = connector(vec![service("alpha", "vpn-a", "user-a")], local)
            .with_authorization_manager(Arc::new(FixedManager));

        let session = connector.factory().unwrap().create_session(None).await.unwrap();
        assert_eq!(session.access_token().as_deref(), Some("token-for-user-a"));
    }

    #[tokio::test]
    async fn oauth2_without_manager_fails_at_session_creation() {
        let mut local = LocalProperties::default();
        local.authentication_scheme = AuthenticationScheme::OAuth2;
        local.oauth2_client_registration_id = Some("my-oauth2-client".into());
        let connector = connector(Vec::new(), local);

        let factory = connector.factory().unwrap();
        let err = factory.create_session(None).await.err().unwrap();
        assert!(matches!(err, SdkError::Config(_)));
    }

    #[test]
    fn oauth2_without_registration_is_rejected() {
        let mut local = LocalProperties::default();
        local.authentication_scheme = AuthenticationScheme::OAuth2;
        let connector = connector(Vec::new(), local).with_authorization_manager(Arc::new(FixedManager));
        assert!(matches!(connector.factory().err().unwrap(), SdkError::Config(_)));
    }
}
