//! Credentials discovered from the deployment environment.
//!
//! A [`Credentials`] bundle describes one broker service instance bound to
//! the application: login, message VPN and the endpoint URIs for every
//! protocol the broker exposes. Every field is optional; a payload that
//! omits a key simply leaves the matching field unset.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Per-protocol endpoint URI lists of a broker service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Endpoints {
    /// Plain SMF hosts (`tcp://host:port`).
    pub smf_hosts: Option<Vec<String>>,
    /// TLS SMF hosts (`tcps://host:port`).
    pub smf_tls_hosts: Option<Vec<String>>,
    /// Compressed SMF hosts.
    pub smf_zip_hosts: Option<Vec<String>>,
    /// JMS JNDI provider URIs.
    pub jms_jndi_uris: Option<Vec<String>>,
    /// JMS JNDI provider URIs over TLS.
    pub jms_jndi_tls_uris: Option<Vec<String>>,
    /// MQTT URIs.
    pub mqtt_uris: Option<Vec<String>>,
    /// MQTT over TLS URIs.
    pub mqtt_tls_uris: Option<Vec<String>>,
    /// MQTT over WebSocket URIs.
    pub mqtt_ws_uris: Option<Vec<String>>,
    /// MQTT over secure WebSocket URIs.
    pub mqtt_wss_uris: Option<Vec<String>>,
    /// REST messaging URIs.
    pub rest_uris: Option<Vec<String>>,
    /// REST messaging URIs over TLS.
    pub rest_tls_uris: Option<Vec<String>>,
    /// AMQP URIs.
    pub amqp_uris: Option<Vec<String>>,
    /// AMQP over TLS URIs.
    pub amqp_tls_uris: Option<Vec<String>>,
}

/// One discovered broker service.
///
/// `id` is the service instance name; the remaining fields come from the
/// `credentials` object of the discovery payload.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Credentials {
    /// Service instance name.
    #[serde(skip)]
    pub id: String,
    /// Client username.
    pub client_username: Option<String>,
    /// Client password.
    pub client_password: Option<String>,
    /// Message VPN the client connects to.
    pub msg_vpn_name: Option<String>,
    /// Protocol endpoints.
    #[serde(flatten)]
    pub endpoints: Endpoints,
    /// Management (SEMP) host names.
    pub management_hostnames: Option<Vec<String>>,
    /// Management username.
    pub management_username: Option<String>,
    /// Management password.
    pub management_password: Option<String>,
    /// Currently active management host.
    pub active_management_hostname: Option<String>,
    /// DMR cluster name.
    pub dmr_cluster_name: Option<String>,
    /// DMR cluster password.
    pub dmr_cluster_password: Option<String>,
}

impl Credentials {
    /// Empty credentials for the given service id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Primary SMF host: the first plain SMF host.
    pub fn smf_host(&self) -> Option<String> {
        first(self.endpoints.smf_hosts.as_ref())
    }

    /// All TLS SMF hosts joined with `,` in payload order.
    pub fn smf_tls_host(&self) -> Option<String> {
        joined(self.endpoints.smf_tls_hosts.as_ref())
    }

    /// First compressed SMF host.
    pub fn smf_zip_host(&self) -> Option<String> {
        first(self.endpoints.smf_zip_hosts.as_ref())
    }

    /// First JNDI provider URI.
    pub fn jms_jndi_uri(&self) -> Option<String> {
        first(self.endpoints.jms_jndi_uris.as_ref())
    }

    /// All TLS JNDI provider URIs joined with `,` in payload order.
    pub fn jms_jndi_tls_uri(&self) -> Option<String> {
        joined(self.endpoints.jms_jndi_tls_uris.as_ref())
    }

    /// First MQTT URI.
    pub fn mqtt_uri(&self) -> Option<String> {
        first(self.endpoints.mqtt_uris.as_ref())
    }

    /// All MQTT TLS URIs joined with `,`.
    pub fn mqtt_tls_uri(&self) -> Option<String> {
        joined(self.endpoints.mqtt_tls_uris.as_ref())
    }

    /// First MQTT WebSocket URI.
    pub fn mqtt_ws_uri(&self) -> Option<String> {
        first(self.endpoints.mqtt_ws_uris.as_ref())
    }

    /// All MQTT secure WebSocket URIs joined with `,`.
    pub fn mqtt_wss_uri(&self) -> Option<String> {
        joined(self.endpoints.mqtt_wss_uris.as_ref())
    }

    /// First REST URI.
    pub fn rest_uri(&self) -> Option<String> {
        first(self.endpoints.rest_uris.as_ref())
    }

    /// All REST TLS URIs joined with `,`.
    pub fn rest_tls_uri(&self) -> Option<String> {
        joined(self.endpoints.rest_tls_uris.as_ref())
    }

    /// First AMQP URI.
    pub fn amqp_uri(&self) -> Option<String> {
        first(self.endpoints.amqp_uris.as_ref())
    }

    /// All AMQP TLS URIs joined with `,`.
    pub fn amqp_tls_uri(&self) -> Option<String> {
        joined(self.endpoints.amqp_tls_uris.as_ref())
    }

    /// First management host name.
    pub fn management_hostname(&self) -> Option<String> {
        first(self.management_hostnames.as_ref())
    }
}

// The joined form depends on the order the platform wrote the list in; the
// payload makes no ordering promise.
fn joined(list: Option<&Vec<String>>) -> Option<String> {
    list.filter(|l| !l.is_empty()).map(|l| l.join(","))
}

fn first(list: Option<&Vec<String>>) -> Option<String> {
    list.and_then(|l| l.first()).cloned()
}

fn redact(value: Option<&String>) -> Option<&'static str> {
    value.map(|_| "***")
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("id", &self.id)
            .field("client_username", &self.client_username)
            .field("client_password", &redact(self.client_password.as_ref()))
            .field("msg_vpn_name", &self.msg_vpn_name)
            .field("endpoints", &self.endpoints)
            .field("management_hostnames", &self.management_hostnames)
            .field("management_username", &self.management_username)
            .field("management_password", &redact(self.management_password.as_ref()))
            .field("active_management_hostname", &self.active_management_hostname)
            .field("dmr_cluster_name", &self.dmr_cluster_name)
            .field("dmr_cluster_password", &redact(self.dmr_cluster_password.as_ref()))
            .finish()
    }
}
