//! OAuth2 authorization manager.
//!
//! The [`AuthorizationManager`] trait is the seam to whatever component
//! actually talks to the identity provider. [`HttpAuthorizationManager`] is
//! a small implementation that covers the grants a broker client needs:
//! `client_credentials`, and reuse of a previously authorized
//! `authorization_code` client kept alive with `refresh_token`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::SdkError;

/// Tokens this close to expiry are treated as expired.
const CLOCK_SKEW_SECS: i64 = 60;

/// Grant used to obtain the first token for a registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GrantType {
    /// Machine-to-machine `client_credentials` grant.
    #[default]
    ClientCredentials,
    /// Interactive `authorization_code` grant. The manager cannot run the
    /// browser leg itself, so the authorized client must be saved upfront.
    AuthorizationCode,
}

impl FromStr for GrantType {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client_credentials" => Ok(Self::ClientCredentials),
            "authorization_code" => Ok(Self::AuthorizationCode),
            other => Err(SdkError::Config(format!("unsupported OAuth2 grant type `{other}`"))),
        }
    }
}

/// Static description of an OAuth2 client.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientRegistration {
    /// Registration id referenced from the connection properties.
    pub registration_id: String,
    /// Token endpoint.
    pub token_uri: String,
    /// OAuth2 client id.
    pub client_id: String,
    /// OAuth2 client secret (HTTP basic client authentication).
    pub client_secret: Option<String>,
    /// Requested scopes.
    pub scopes: Vec<String>,
    /// Grant for the first token.
    pub grant_type: GrantType,
}

impl fmt::Debug for ClientRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRegistration")
            .field("registration_id", &self.registration_id)
            .field("token_uri", &self.token_uri)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("scopes", &self.scopes)
            .field("grant_type", &self.grant_type)
            .finish()
    }
}

/// Who is asking for a token, under which registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizeRequest {
    /// Client registration id.
    pub registration_id: String,
    /// Principal (client username) the token is issued for.
    pub principal: String,
}

/// An issued access token.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// Opaque token value.
    pub value: String,
    /// Expiry instant, when the provider reported one.
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// `true` when the token expires within the clock-skew window of `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| {
            exp.checked_sub_signed(Duration::seconds(CLOCK_SKEW_SECS))
                .map_or(true, |deadline| deadline <= now)
        })
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"***")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// A principal's authorized client: current access token plus the refresh
/// token, if any.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizedClient {
    /// Client registration id.
    pub registration_id: String,
    /// Principal the client was authorized for.
    pub principal: String,
    /// Current access token.
    pub access_token: AccessToken,
    /// Refresh token.
    pub refresh_token: Option<String>,
}

impl fmt::Debug for AuthorizedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedClient")
            .field("registration_id", &self.registration_id)
            .field("principal", &self.principal)
            .field("access_token", &self.access_token)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Issues and refreshes access tokens on behalf of a principal.
#[async_trait]
pub trait AuthorizationManager: Send + Sync {
    /// Return an authorized client with a usable access token.
    async fn authorize(&self, request: &AuthorizeRequest) -> Result<AuthorizedClient, SdkError>;
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
}

/// [`AuthorizationManager`] backed by the token endpoint of each
/// registration.
///
/// Authorized clients are kept in memory per `(registration, principal)`.
/// A stored token is reused until it is about to expire. Then
/// `client_credentials` registrations run their grant again, and
/// `authorization_code` clients are refreshed with their refresh token.
pub struct HttpAuthorizationManager {
    http: reqwest::Client,
    registrations: HashMap<String, ClientRegistration>,
    store: Mutex<HashMap<(String, String), AuthorizedClient>>,
}

impl HttpAuthorizationManager {
    /// Create a manager for the given registrations.
    pub fn new(registrations: impl IntoIterator<Item = ClientRegistration>) -> Self {
        Self {
            http: reqwest::Client::new(),
            registrations: registrations
                .into_iter()
                .map(|r| (r.registration_id.clone(), r))
                .collect(),
            store: Mutex::new(HashMap::new()),
        }
    }

    /// Use a preconfigured HTTP client (timeouts, proxies, TLS roots).
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Store an authorized client, e.g. after an interactive code exchange.
    pub fn save_authorized_client(&self, client: AuthorizedClient) {
        let key = (client.registration_id.clone(), client.principal.clone());
        self.lock_store().insert(key, client);
    }

    /// Look up a stored authorized client.
    pub fn load_authorized_client(
        &self,
        registration_id: &str,
        principal: &str,
    ) -> Option<AuthorizedClient> {
        self.lock_store()
            .get(&(registration_id.to_string(), principal.to_string()))
            .cloned()
    }

    /// Forget a stored authorized client.
    pub fn remove_authorized_client(&self, registration_id: &str, principal: &str) {
        self.lock_store()
            .remove(&(registration_id.to_string(), principal.to_string()));
    }

    fn lock_store(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), AuthorizedClient>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn request_token(
        &self,
        registration: &ClientRegistration,
        mut form: Vec<(&'static str, String)>,
    ) -> Result<TokenResponse, SdkError> {
        if !registration.scopes.is_empty() {
            form.push(("scope", registration.scopes.join(" ")));
        }

        let res = self
            .http
            .post(&registration.token_uri)
            .basic_auth(&registration.client_id, registration.client_secret.as_ref())
            .form(&form)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(SdkError::Auth(format!(
                "token endpoint returned {status}: {text}"
            )));
        }

        Ok(res.json().await?)
    }
}

#[async_trait]
impl AuthorizationManager for HttpAuthorizationManager {
    async fn authorize(&self, request: &AuthorizeRequest) -> Result<AuthorizedClient, SdkError> {
        let registration = self.registrations.get(&request.registration_id).ok_or_else(|| {
            SdkError::Authorization(format!(
                "unknown client registration `{}`",
                request.registration_id
            ))
        })?;

        let now = Utc::now();
        let existing = self.load_authorized_client(&request.registration_id, &request.principal);
        if let Some(client) = &existing {
            if !client.access_token.is_expired_at(now) {
                debug!(registration_id = %request.registration_id, "reusing stored access token");
                return Ok(client.clone());
            }
        }

        // client_credentials registrations re-run their grant on expiry.
        let previous_refresh = existing
            .and_then(|c| c.refresh_token)
            .filter(|_| registration.grant_type == GrantType::AuthorizationCode);
        let response = match &previous_refresh {
            Some(refresh_token) => {
                info!(registration_id = %request.registration_id, "refreshing OAuth2 access token");
                let form = vec![
                    ("grant_type", "refresh_token".to_string()),
                    ("refresh_token", refresh_token.clone()),
                ];
                match self.request_token(registration, form).await {
                    Ok(response) => response,
                    Err(e) => {
                        self.remove_authorized_client(&request.registration_id, &request.principal);
                        return Err(e);
                    }
                }
            }
            None => match registration.grant_type {
                GrantType::ClientCredentials => {
                    info!(
                        registration_id = %request.registration_id,
                        "requesting OAuth2 access token (client_credentials)"
                    );
                    let form = vec![("grant_type", "client_credentials".to_string())];
                    self.request_token(registration, form).await?
                }
                GrantType::AuthorizationCode => {
                    return Err(SdkError::Authorization(format!(
                        "registration `{}` uses authorization_code and principal `{}` has no authorized client",
                        request.registration_id, request.principal
                    )));
                }
            },
        };

        let value = response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SdkError::Auth("missing `access_token` in token response".into()))?;

        let client = AuthorizedClient {
            registration_id: request.registration_id.clone(),
            principal: request.principal.clone(),
            access_token: AccessToken {
                value,
                expires_at: response.expires_in.and_then(|secs| expiry(now, secs)),
            },
            refresh_token: response.refresh_token.or(previous_refresh),
        };
        self.save_authorized_client(client.clone());
        Ok(client)
    }
}

/// Expiry instant `secs` after `now`; `None` when out of range.
fn expiry(now: DateTime<Utc>, secs: i64) -> Option<DateTime<Utc>> {
    let at = Duration::try_seconds(secs).and_then(|lifetime| now.checked_add_signed(lifetime));
    if at.is_none() {
        warn!(expires_in = secs, "token lifetime out of range, treating token as non-expiring");
    }
    at
}
