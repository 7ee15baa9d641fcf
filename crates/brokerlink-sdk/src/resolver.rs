//! Merge discovered credentials with local defaults.
//!
//! Precedence is decided field by field: a discovered value wins when
//! present, otherwise the local default applies. Retry policy, the
//! authentication scheme, the OAuth2 registration and the passthrough
//! property bag are operational knobs and always come from local
//! configuration.

use brokerlink_models::{ConnectionProperties, Credentials, JndiProperties, LocalProperties};

/// Stateless resolver producing canonical property sets.
///
/// Every call builds a fresh value from its inputs only, so resolving one
/// service can never leak into the resolution of another.
///
/// # Examples
///
/// ```
/// use brokerlink_models::{Credentials, LocalProperties};
/// use brokerlink_sdk::PropertyResolver;
///
/// let local = LocalProperties::default();
/// let mut creds = Credentials::new("svc");
/// creds.msg_vpn_name = Some("sample-msg-vpn".into());
///
/// let props = PropertyResolver::resolve(&local, Some(&creds));
/// assert_eq!(props.vpn, "sample-msg-vpn");
/// assert_eq!(props.host, "localhost");
/// ```
pub struct PropertyResolver;

impl PropertyResolver {
    /// Build the canonical connection properties.
    ///
    /// `credentials = None` (nothing discovered) yields the local defaults.
    pub fn resolve(local: &LocalProperties, credentials: Option<&Credentials>) -> ConnectionProperties {
        let discovered = |f: fn(&Credentials) -> Option<String>| credentials.and_then(f);

        ConnectionProperties {
            host: discovered(Credentials::smf_host).unwrap_or_else(|| local.host.clone()),
            vpn: discovered(|c| c.msg_vpn_name.clone()).unwrap_or_else(|| local.msg_vpn.clone()),
            username: discovered(|c| c.client_username.clone())
                .unwrap_or_else(|| local.client_username.clone()),
            password: discovered(|c| c.client_password.clone())
                .or_else(|| local.client_password.clone()),
            client_name: local.client_name.clone().filter(|name| !name.is_empty()),
            endpoints: credentials.map(|c| c.endpoints.clone()).unwrap_or_default(),
            channel: local.channel,
            authentication_scheme: local.authentication_scheme,
            oauth2_client_registration_id: local.oauth2_client_registration_id.clone(),
            oauth2_access_token: None,
            extra: local.api_properties.clone(),
        }
    }

    /// Build the environment for a JNDI initial-context lookup.
    ///
    /// The principal is `user@vpn`; the discovered pair is only used when
    /// both halves were discovered, so a principal never mixes sources.
    pub fn resolve_jndi(local: &LocalProperties, credentials: Option<&Credentials>) -> JndiProperties {
        let discovered_principal = credentials.and_then(|c| {
            Some(format!(
                "{}@{}",
                c.client_username.as_ref()?,
                c.msg_vpn_name.as_ref()?
            ))
        });

        JndiProperties {
            provider_url: credentials
                .and_then(Credentials::jms_jndi_uri)
                .unwrap_or_else(|| local.host.clone()),
            security_principal: discovered_principal
                .unwrap_or_else(|| format!("{}@{}", local.client_username, local.msg_vpn)),
            security_credentials: credentials
                .and_then(|c| c.client_password.clone())
                .or_else(|| local.client_password.clone()),
            extra: local.api_properties.clone(),
        }
    }
}
