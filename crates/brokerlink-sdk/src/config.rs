//! Configuration loaded from environment variables.
//!
//! [`SdkConfig::from_env`] reads the process environment once at startup.
//! Everything below it takes the resulting values by injection, so tests
//! build configs through [`SdkConfig::from_vars`] without touching the
//! real environment.

use std::collections::BTreeMap;
use std::str::FromStr;

use brokerlink_models::{AuthenticationScheme, LocalProperties};
use tracing::warn;

use crate::error::SdkError;
use crate::oauth::{ClientRegistration, GrantType};

const PREFIX: &str = "BROKERLINK_";
const API_PREFIX: &str = "BROKERLINK_API_";
const OAUTH2_PREFIX: &str = "BROKERLINK_OAUTH2_";

/// Local connection defaults plus OAuth2 client registrations.
#[derive(Debug, Clone, Default)]
pub struct SdkConfig {
    /// Statically configured connection defaults.
    pub local: LocalProperties,
    /// OAuth2 client registrations, keyed by registration id.
    pub registrations: BTreeMap<String, ClientRegistration>,
}

impl SdkConfig {
    /// Build the configuration from the process environment.
    ///
    /// | Variable                                   | Default                          |
    /// |--------------------------------------------|----------------------------------|
    /// | `BROKERLINK_HOST`                          | `localhost`                      |
    /// | `BROKERLINK_MSG_VPN`                       | `default`                        |
    /// | `BROKERLINK_CLIENT_USERNAME`               | `spring-default-client-username` |
    /// | `BROKERLINK_CLIENT_PASSWORD`               | unset                            |
    /// | `BROKERLINK_CLIENT_NAME`                   | unset                            |
    /// | `BROKERLINK_CONNECT_RETRIES`               | `1`                              |
    /// | `BROKERLINK_RECONNECT_RETRIES`             | `5`                              |
    /// | `BROKERLINK_CONNECT_RETRIES_PER_HOST`      | `20`                             |
    /// | `BROKERLINK_RECONNECT_RETRY_WAIT_MS`       | `3000`                           |
    /// | `BROKERLINK_AUTHENTICATION_SCHEME`         | `BASIC`                          |
    /// | `BROKERLINK_OAUTH2_CLIENT_REGISTRATION_ID` | unset                            |
    /// | `BROKERLINK_API_{KEY}`                     | passthrough property `{KEY}`     |
    ///
    /// OAuth2 registrations are declared with
    /// `BROKERLINK_OAUTH2_{ID}_TOKEN_URI` plus optional `_CLIENT_ID`,
    /// `_CLIENT_SECRET`, `_SCOPES` (comma-separated) and `_GRANT_TYPE`.
    /// `{ID}` is upper-cased with `-` written as `_`, so `my-oauth2-client`
    /// becomes `MY_OAUTH2_CLIENT`.
    pub fn from_env() -> Result<Self, SdkError> {
        Self::from_vars(std::env::vars())
    }

    /// Build the configuration from an explicit set of variables.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, SdkError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: BTreeMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| k.starts_with(PREFIX))
            .collect();
        let get = |name: &str| vars.get(&format!("{PREFIX}{name}")).cloned();

        let mut local = LocalProperties::default();
        if let Some(host) = get("HOST") {
            local.host = host;
        }
        if let Some(vpn) = get("MSG_VPN") {
            local.msg_vpn = vpn;
        }
        if let Some(username) = get("CLIENT_USERNAME") {
            local.client_username = username;
        }
        local.client_password = get("CLIENT_PASSWORD");
        local.client_name = get("CLIENT_NAME");
        local.oauth2_client_registration_id = get("OAUTH2_CLIENT_REGISTRATION_ID");

        let channel = &mut local.channel;
        channel.connect_retries = parse_or("CONNECT_RETRIES", get("CONNECT_RETRIES"), channel.connect_retries);
        channel.reconnect_retries =
            parse_or("RECONNECT_RETRIES", get("RECONNECT_RETRIES"), channel.reconnect_retries);
        channel.connect_retries_per_host = parse_or(
            "CONNECT_RETRIES_PER_HOST",
            get("CONNECT_RETRIES_PER_HOST"),
            channel.connect_retries_per_host,
        );
        channel.reconnect_retry_wait_ms = parse_or(
            "RECONNECT_RETRY_WAIT_MS",
            get("RECONNECT_RETRY_WAIT_MS"),
            channel.reconnect_retry_wait_ms,
        );

        if let Some(scheme) = get("AUTHENTICATION_SCHEME") {
            local.authentication_scheme = AuthenticationScheme::parse(&scheme)?;
        }

        local.api_properties = vars
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(API_PREFIX)
                    .filter(|key| !key.is_empty())
                    .map(|key| (key.to_string(), v.clone()))
            })
            .collect();

        let registrations = registrations_from(&vars)?;

        Ok(Self {
            local,
            registrations,
        })
    }
}

fn parse_or<T: FromStr + Copy>(name: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(variable = %format!("{PREFIX}{name}"), value = %raw, "ignoring unparsable value");
            default
        }),
    }
}

fn registrations_from(
    vars: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, ClientRegistration>, SdkError> {
    let mut registrations = BTreeMap::new();

    for (key, token_uri) in vars {
        let Some(env_id) = key
            .strip_prefix(OAUTH2_PREFIX)
            .and_then(|rest| rest.strip_suffix("_TOKEN_URI"))
            .filter(|id| !id.is_empty())
        else {
            continue;
        };

        let field = |suffix: &str| vars.get(&format!("{OAUTH2_PREFIX}{env_id}_{suffix}")).cloned();
        let grant_type = match field("GRANT_TYPE") {
            Some(raw) => raw.parse::<GrantType>()?,
            None => GrantType::default(),
        };
        let scopes = field("SCOPES")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let registration_id = env_id.to_ascii_lowercase().replace('_', "-");
        registrations.insert(
            registration_id.clone(),
            ClientRegistration {
                registration_id,
                token_uri: token_uri.clone(),
                client_id: field("CLIENT_ID").unwrap_or_default(),
                client_secret: field("CLIENT_SECRET"),
                scopes,
                grant_type,
            },
        );
    }

    Ok(registrations)
}
