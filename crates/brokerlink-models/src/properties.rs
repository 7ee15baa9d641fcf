//! Local connection defaults and the canonical resolved property set.
//!
//! [`LocalProperties`] is what the deployer configures; it carries every
//! knob with a sensible default. [`ConnectionProperties`] is the single
//! object a session is opened from, built fresh on every resolution.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::auth::AuthenticationScheme;
use crate::credentials::Endpoints;

/// Default broker host.
pub const DEFAULT_HOST: &str = "localhost";
/// Default message VPN.
pub const DEFAULT_MSG_VPN: &str = "default";
/// Client identity used when no username is configured.
pub const DEFAULT_CLIENT_USERNAME: &str = "spring-default-client-username";
/// Default number of initial connect attempts.
pub const DEFAULT_CONNECT_RETRIES: i32 = 1;
/// Default number of reconnect attempts after a session drops.
pub const DEFAULT_RECONNECT_RETRIES: i32 = 5;
/// Default number of attempts per host before moving to the next host.
pub const DEFAULT_CONNECT_RETRIES_PER_HOST: i32 = 20;
/// Default wait between connect / reconnect attempts, in milliseconds.
pub const DEFAULT_RECONNECT_RETRY_WAIT_MS: u32 = 3000;

/// Retry and backoff tunables handed to the underlying client.
///
/// A negative retry count means "retry forever".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelProperties {
    /// Attempts for the initial connection.
    pub connect_retries: i32,
    /// Attempts after an established session goes down.
    pub reconnect_retries: i32,
    /// Attempts per host of a host list before moving on.
    pub connect_retries_per_host: i32,
    /// Wait between attempts, in milliseconds.
    pub reconnect_retry_wait_ms: u32,
}

impl Default for ChannelProperties {
    fn default() -> Self {
        Self {
            connect_retries: DEFAULT_CONNECT_RETRIES,
            reconnect_retries: DEFAULT_RECONNECT_RETRIES,
            connect_retries_per_host: DEFAULT_CONNECT_RETRIES_PER_HOST,
            reconnect_retry_wait_ms: DEFAULT_RECONNECT_RETRY_WAIT_MS,
        }
    }
}

/// Statically configured connection defaults.
///
/// Discovered credentials override host, VPN, username and password field by
/// field. Everything else (retry policy, scheme, property bag) is owned by the
/// deployer and always comes from here.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocalProperties {
    /// Broker host, or a comma-separated host list.
    pub host: String,
    /// Message VPN.
    pub msg_vpn: String,
    /// Client username.
    pub client_username: String,
    /// Client password.
    pub client_password: Option<String>,
    /// Unique client name; generated by the client library when unset.
    pub client_name: Option<String>,
    /// Retry policy.
    #[serde(flatten)]
    pub channel: ChannelProperties,
    /// Authentication scheme.
    pub authentication_scheme: AuthenticationScheme,
    /// OAuth2 client registration used to obtain access tokens.
    pub oauth2_client_registration_id: Option<String>,
    /// Free-form properties passed through to the client library untouched.
    pub api_properties: BTreeMap<String, String>,
}

impl Default for LocalProperties {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            msg_vpn: DEFAULT_MSG_VPN.to_string(),
            client_username: DEFAULT_CLIENT_USERNAME.to_string(),
            client_password: None,
            client_name: None,
            channel: ChannelProperties::default(),
            authentication_scheme: AuthenticationScheme::default(),
            oauth2_client_registration_id: None,
            api_properties: BTreeMap::new(),
        }
    }
}

/// The canonical property set a session is opened from.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProperties {
    /// Broker host, or a comma-separated host list.
    pub host: String,
    /// Message VPN.
    pub vpn: String,
    /// Client username.
    pub username: String,
    /// Client password.
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Client name.
    pub client_name: Option<String>,
    /// Per-protocol endpoints of the discovered service, if any.
    pub endpoints: Endpoints,
    /// Retry policy.
    pub channel: ChannelProperties,
    /// Authentication scheme.
    pub authentication_scheme: AuthenticationScheme,
    /// OAuth2 client registration id.
    pub oauth2_client_registration_id: Option<String>,
    /// Bearer token, set only on the OAuth2 path.
    #[serde(skip_serializing)]
    pub oauth2_access_token: Option<String>,
    /// Passthrough properties.
    pub extra: BTreeMap<String, String>,
}

impl ConnectionProperties {
    /// The properties with `token` injected as the OAuth2 access token.
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.oauth2_access_token = Some(token.into());
        self
    }
}

/// Environment for a JNDI initial-context lookup against the broker.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JndiProperties {
    /// JNDI provider URL.
    pub provider_url: String,
    /// Principal in `username@vpn` form.
    pub security_principal: String,
    /// Password.
    #[serde(skip_serializing)]
    pub security_credentials: Option<String>,
    /// Passthrough properties.
    pub extra: BTreeMap<String, String>,
}

fn redact(value: Option<&String>) -> Option<&'static str> {
    value.map(|_| "***")
}

impl fmt::Debug for LocalProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalProperties")
            .field("host", &self.host)
            .field("msg_vpn", &self.msg_vpn)
            .field("client_username", &self.client_username)
            .field("client_password", &redact(self.client_password.as_ref()))
            .field("client_name", &self.client_name)
            .field("channel", &self.channel)
            .field("authentication_scheme", &self.authentication_scheme)
            .field(
                "oauth2_client_registration_id",
                &self.oauth2_client_registration_id,
            )
            .field("api_properties", &self.api_properties)
            .finish()
    }
}

impl fmt::Debug for ConnectionProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProperties")
            .field("host", &self.host)
            .field("vpn", &self.vpn)
            .field("username", &self.username)
            .field("password", &redact(self.password.as_ref()))
            .field("client_name", &self.client_name)
            .field("endpoints", &self.endpoints)
            .field("channel", &self.channel)
            .field("authentication_scheme", &self.authentication_scheme)
            .field(
                "oauth2_client_registration_id",
                &self.oauth2_client_registration_id,
            )
            .field("oauth2_access_token", &redact(self.oauth2_access_token.as_ref()))
            .field("extra", &self.extra)
            .finish()
    }
}

impl fmt::Debug for JndiProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JndiProperties")
            .field("provider_url", &self.provider_url)
            .field("security_principal", &self.security_principal)
            .field(
                "security_credentials",
                &redact(self.security_credentials.as_ref()),
            )
            .field("extra", &self.extra)
            .finish()
    }
}
