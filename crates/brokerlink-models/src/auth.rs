//! Authentication scheme selection.
//!
//! The scheme is a closed set, so every code path that depends on it does a
//! single exhaustive `match` instead of comparing strings.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumString};

use crate::error::ModelError;

/// How a session authenticates against the broker.
///
/// Parsing is ASCII case-insensitive and accepts both the short form
/// (`OAUTH2`) and the long broker-API form (`AUTHENTICATION_SCHEME_OAUTH2`).
///
/// # Examples
///
/// ```
/// use brokerlink_models::AuthenticationScheme;
///
/// let scheme: AuthenticationScheme = "oauth2".parse().unwrap();
/// assert_eq!(scheme, AuthenticationScheme::OAuth2);
///
/// let scheme: AuthenticationScheme = "AUTHENTICATION_SCHEME_CLIENT_CERTIFICATE".parse().unwrap();
/// assert_eq!(scheme, AuthenticationScheme::ClientCertificate);
/// assert_eq!(scheme.to_string(), "CLIENT_CERTIFICATE");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum AuthenticationScheme {
    /// No credentials are presented.
    #[strum(to_string = "NONE", serialize = "AUTHENTICATION_SCHEME_NONE")]
    None,
    /// Username and password.
    #[default]
    #[strum(to_string = "BASIC", serialize = "AUTHENTICATION_SCHEME_BASIC")]
    Basic,
    /// Mutual TLS with a client certificate.
    #[strum(
        to_string = "CLIENT_CERTIFICATE",
        serialize = "CLIENT_CERT",
        serialize = "AUTHENTICATION_SCHEME_CLIENT_CERTIFICATE"
    )]
    ClientCertificate,
    /// Kerberos / GSS-API.
    #[strum(to_string = "KERBEROS", serialize = "AUTHENTICATION_SCHEME_GSS_KRB")]
    Kerberos,
    /// OAuth2 bearer token.
    #[strum(to_string = "OAUTH2", serialize = "AUTHENTICATION_SCHEME_OAUTH2")]
    OAuth2,
}

impl AuthenticationScheme {
    /// Parse a scheme name, mapping failures onto [`ModelError`].
    pub fn parse(value: &str) -> Result<Self, ModelError> {
        Self::from_str(value.trim()).map_err(|_| ModelError::UnknownAuthenticationScheme {
            value: value.to_string(),
        })
    }

    /// `true` for [`AuthenticationScheme::OAuth2`].
    pub fn is_oauth2(self) -> bool {
        matches!(self, Self::OAuth2)
    }
}

impl Serialize for AuthenticationScheme {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AuthenticationScheme {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
