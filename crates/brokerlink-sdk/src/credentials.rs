//! Sources of discovered broker credentials.
//!
//! A [`CredentialSource`] answers "which broker services is this
//! deployment bound to?". Callers never branch on how many services exist:
//! zero, one or many discovered services go through the same calls, and an
//! empty answer is not an error.

use brokerlink_models::Credentials;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::SdkError;

/// Label and tag that mark a listing as a broker service.
pub const SERVICE_LABEL: &str = "solace-pubsub";

/// Environment variable holding the discovery document.
pub const VCAP_SERVICES_ENV: &str = "VCAP_SERVICES";

/// Yields the credentials of every discovered broker service.
pub trait CredentialSource: Send + Sync {
    /// All discovered services, in discovery order. May be empty.
    fn list_all(&self) -> Vec<Credentials>;

    /// The service with the given id, if discovered.
    fn find_by_id(&self, id: &str) -> Option<Credentials> {
        self.list_all().into_iter().find(|c| c.id == id)
    }

    /// The first discovered service, if any.
    fn find_first(&self) -> Option<Credentials> {
        self.list_all().into_iter().next()
    }

    /// Like [`find_by_id`](Self::find_by_id), but absence is an error.
    fn require_by_id(&self, id: &str) -> Result<Credentials, SdkError> {
        self.find_by_id(id)
            .ok_or_else(|| SdkError::MissingResource(format!("no broker service with id `{id}`")))
    }
}

/// A fixed, in-memory list of credentials.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialSource {
    services: Vec<Credentials>,
}

impl StaticCredentialSource {
    /// Wrap the given credentials.
    pub fn new(services: Vec<Credentials>) -> Self {
        Self { services }
    }

    /// A source that discovers nothing.
    pub fn empty() -> Self {
        Self::default()
    }
}

impl CredentialSource for StaticCredentialSource {
    fn list_all(&self) -> Vec<Credentials> {
        self.services.clone()
    }
}

#[derive(Deserialize)]
struct ServiceListing {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    credentials: Option<Value>,
}

impl ServiceListing {
    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().flatten().any(|t| t == tag)
    }
}

/// Credentials parsed from a Cloud Foundry style `VCAP_SERVICES` document.
///
/// The document maps a service label to its listings. Every listing under
/// the [`SERVICE_LABEL`] label is a broker service. Listings under other
/// labels count when they carry the [`SERVICE_LABEL`] tag, unless a service
/// of the same name was already found.
///
/// The document is read once, at construction; the source is a snapshot.
#[derive(Debug, Clone, Default)]
pub struct VcapCredentialSource {
    services: Vec<Credentials>,
}

impl VcapCredentialSource {
    /// Parse a discovery document.
    ///
    /// Only a document that is not a JSON object is an error. Individual
    /// listings that are malformed are skipped with a warning, and a listing
    /// without usable credentials yields empty credentials.
    pub fn from_json(document: &str) -> Result<Self, SdkError> {
        let root: serde_json::Map<String, Value> = serde_json::from_str(document)?;

        let mut listings: Vec<ServiceListing> = Vec::new();

        let parsed = |label: &str, raw: &Value| -> Vec<ServiceListing> {
            let Some(entries) = raw.as_array() else {
                warn!(%label, "service label does not map to a list; ignoring");
                return Vec::new();
            };
            entries
                .iter()
                .filter_map(|entry| match ServiceListing::deserialize(entry) {
                    Ok(listing) => Some(listing),
                    Err(e) => {
                        warn!(%label, error = %e, "ignoring malformed service listing");
                        None
                    }
                })
                .collect()
        };

        if let Some(raw) = root.get(SERVICE_LABEL) {
            listings.extend(parsed(SERVICE_LABEL, raw));
        }
        for (label, raw) in &root {
            if label == SERVICE_LABEL {
                continue;
            }
            for listing in parsed(label, raw) {
                if !listing.has_tag(SERVICE_LABEL) {
                    continue;
                }
                if listings.iter().any(|l| l.name() == listing.name()) {
                    debug!(service = %listing.name(), "skipping duplicate service listing");
                } else {
                    listings.push(listing);
                }
            }
        }

        let services = listings.into_iter().map(credentials_of).collect();
        Ok(Self { services })
    }

    /// Read the document from `VCAP_SERVICES`.
    ///
    /// A missing or unparsable variable means nothing was discovered.
    pub fn from_env() -> Self {
        match std::env::var(VCAP_SERVICES_ENV) {
            Ok(document) => Self::from_json(&document).unwrap_or_else(|e| {
                warn!(error = %e, "could not parse {VCAP_SERVICES_ENV}; no services discovered");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }
}

fn credentials_of(listing: ServiceListing) -> Credentials {
    let id = listing.name().to_string();
    let mut credentials = match listing.credentials {
        None | Some(Value::Null) => {
            debug!(service = %id, label = ?listing.label, "service listing has no credentials");
            Credentials::default()
        }
        Some(raw) => serde_json::from_value(raw).unwrap_or_else(|e| {
            warn!(service = %id, error = %e, "unreadable service credentials; using local defaults");
            Credentials::default()
        }),
    };
    credentials.id = id;
    credentials
}

impl CredentialSource for VcapCredentialSource {
    fn list_all(&self) -> Vec<Credentials> {
        self.services.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn one_service() -> Value {
        json!({
            "label": "solace-pubsub",
            "name": "test-service-instance-name",
            "plan": "vmr-shared",
            "tags": ["solace", "solace-pubsub", "mqtt", "jms"],
            "credentials": {
                "clientUsername": "sample-client-username",
                "clientPassword": "sample-client-password",
                "msgVpnName": "sample-msg-vpn",
                "smfHosts": ["tcp://192.168.1.50:7000"],
                "smfTlsHosts": ["tcps://192.168.1.50:7003", "tcps://192.168.1.51:7003"],
                "jmsJndiUris": ["smf://192.168.1.50:7000"],
                "managementUsername": "sample-mgmt-username"
            }
        })
    }

    fn user_provided_service() -> Value {
        json!({
            "label": "user-provided",
            "name": "internal-solace-pubsub",
            "binding_name": null,
            "tags": ["solace-pubsub"],
            "credentials": {
                "clientUsername": "sample-client-username2",
                "msgVpnName": "sample-msg-vpn2",
                "smfHosts": ["tcp://192.168.1.51:7000"]
            }
        })
    }

    #[test]
    fn finds_service_by_label() {
        let doc = json!({ "solace-pubsub": [one_service()] }).to_string();
        let source = VcapCredentialSource::from_json(&doc).unwrap();

        let all = source.list_all();
        assert_eq!(all.len(), 1);
        let creds = &all[0];
        assert_eq!(creds.id, "test-service-instance-name");
        assert_eq!(creds.client_username.as_deref(), Some("sample-client-username"));
        assert_eq!(creds.smf_host().as_deref(), Some("tcp://192.168.1.50:7000"));
        assert_eq!(
            creds.smf_tls_host().as_deref(),
            Some("tcps://192.168.1.50:7003,tcps://192.168.1.51:7003")
        );
    }

    #[test]
    fn finds_user_provided_service_by_tag() {
        let doc = json!({ "user-provided": [user_provided_service()] }).to_string();
        let source = VcapCredentialSource::from_json(&doc).unwrap();
        let first = source.find_first().unwrap();
        assert_eq!(first.id, "internal-solace-pubsub");
        assert_eq!(first.msg_vpn_name.as_deref(), Some("sample-msg-vpn2"));
        assert!(first.client_password.is_none());
    }

    #[test]
    fn label_and_tag_matches_are_deduplicated() {
        let mut tagged_copy = one_service();
        tagged_copy["label"] = json!("other");
        let doc = json!({
            "solace-pubsub": [one_service()],
            "other": [tagged_copy, user_provided_service()],
        })
        .to_string();

        let source = VcapCredentialSource::from_json(&doc).unwrap();
        let ids: Vec<String> = source.list_all().into_iter().map(|c| c.id).collect();
        assert_eq!(
            ids,
            vec![
                "test-service-instance-name".to_string(),
                "internal-solace-pubsub".to_string()
            ]
        );
    }

    #[test]
    fn label_listings_are_never_collapsed() {
        let doc = json!({
            "solace-pubsub": [
                { "credentials": { "msgVpnName": "vpn-a" } },
                { "credentials": { "msgVpnName": "vpn-b" } },
                one_service(),
                one_service()
            ],
            "user-provided": [
                { "tags": ["solace-pubsub"], "credentials": { "msgVpnName": "vpn-c" } }
            ]
        })
        .to_string();

        let source = VcapCredentialSource::from_json(&doc).unwrap();
        let vpns: Vec<Option<String>> = source
            .list_all()
            .into_iter()
            .map(|c| c.msg_vpn_name)
            .collect();
        assert_eq!(
            vpns,
            vec![
                Some("vpn-a".to_string()),
                Some("vpn-b".to_string()),
                Some("sample-msg-vpn".to_string()),
                Some("sample-msg-vpn".to_string()),
            ]
        );
    }

    #[test]
    fn other_services_are_ignored() {
        let doc = json!({ "otherService": [{ "id": "1" }, { "id": "2" }] }).to_string();
        let source = VcapCredentialSource::from_json(&doc).unwrap();
        assert!(source.list_all().is_empty());
        assert!(source.find_first().is_none());
    }

    #[test]
    fn null_or_missing_credentials_degrade_to_empty() {
        let doc = json!({
            "solace-pubsub": [
                { "name": "no-creds", "tags": [] },
                { "name": "null-creds", "credentials": null },
                { "name": "bad-creds", "credentials": { "clientUsername": 42 } }
            ]
        })
        .to_string();

        let source = VcapCredentialSource::from_json(&doc).unwrap();
        let all = source.list_all();
        assert_eq!(all.len(), 3);
        for creds in &all {
            assert_eq!(*creds, Credentials::new(creds.id.clone()));
        }
    }

    #[test]
    fn non_object_document_is_an_error() {
        assert!(VcapCredentialSource::from_json("[]").is_err());
        assert!(VcapCredentialSource::from_json("not json").is_err());
    }

    #[test]
    fn lookups_by_id() {
        let source = StaticCredentialSource::new(vec![Credentials::new("a"), Credentials::new("b")]);
        assert_eq!(source.find_by_id("b").unwrap().id, "b");
        assert!(source.find_by_id("c").is_none());
        assert_eq!(source.find_first().unwrap().id, "a");

        let err = source.require_by_id("c").unwrap_err();
        assert!(matches!(err, SdkError::MissingResource(_)));
    }

    #[test]
    fn empty_source_behaves() {
        let source = StaticCredentialSource::empty();
        assert!(source.list_all().is_empty());
        assert!(source.find_first().is_none());
        assert!(source.find_by_id("anything").is_none());
    }
}
