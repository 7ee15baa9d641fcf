//! Bearer-token acquisition for OAuth2 sessions.

use std::sync::Arc;

use async_trait::async_trait;
use brokerlink_models::{ConnectionProperties, DEFAULT_CLIENT_USERNAME};
use tracing::{debug, info};

use crate::error::SdkError;
use crate::oauth::{AuthorizationManager, AuthorizeRequest};

/// Something that can hand out the current bearer token.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Fetch a usable access token.
    ///
    /// Fails with an authentication or authorization error when no token can
    /// be issued.
    async fn access_token(&self) -> Result<String, SdkError>;
}

/// [`TokenProvider`] that asks an [`AuthorizationManager`] for a token on
/// behalf of the session's principal.
pub struct OAuth2TokenProvider {
    request: AuthorizeRequest,
    manager: Arc<dyn AuthorizationManager>,
}

impl OAuth2TokenProvider {
    /// Build a provider for the given connection properties.
    ///
    /// The principal is the configured username, or the default client
    /// identity when the username is empty. A missing registration id is a
    /// configuration error.
    pub fn new(
        properties: &ConnectionProperties,
        manager: Arc<dyn AuthorizationManager>,
    ) -> Result<Self, SdkError> {
        let registration_id = properties
            .oauth2_client_registration_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                SdkError::Config("OAuth2 client registration id is not configured".into())
            })?;

        let principal = if properties.username.is_empty() {
            DEFAULT_CLIENT_USERNAME.to_string()
        } else {
            properties.username.clone()
        };

        Ok(Self {
            request: AuthorizeRequest {
                registration_id,
                principal,
            },
            manager,
        })
    }

    /// Registration the provider authorizes against.
    pub fn registration_id(&self) -> &str {
        &self.request.registration_id
    }

    /// Principal the provider authorizes as.
    pub fn principal(&self) -> &str {
        &self.request.principal
    }
}

#[async_trait]
impl TokenProvider for OAuth2TokenProvider {
    async fn access_token(&self) -> Result<String, SdkError> {
        info!(
            registration_id = %self.request.registration_id,
            principal = %self.request.principal,
            "fetching OAuth2 access token"
        );

        let client = self.manager.authorize(&self.request).await.map_err(|e| {
            debug!(error = %e, "authorization manager failed to issue a token");
            e
        })?;

        if client.access_token.value.is_empty() {
            return Err(SdkError::Auth(format!(
                "no access token issued for registration `{}`",
                self.request.registration_id
            )));
        }
        Ok(client.access_token.value)
    }
}
