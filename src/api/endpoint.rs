use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    api::ChallengeRequest,
    label::{normalize_label_value, trim_root_dot, DNS_NAME_LABEL, FQDN_LABEL, ZONE_LABEL},
};

/// Prefix of the names the cluster generates for challenge objects.
pub const GENERATE_NAME_PREFIX: &str = "dns01-challenge-";

/// Record type of challenge records.
pub const RECORD_TYPE_TXT: &str = "TXT";

/// Provider specific setting attached to an [`Endpoint`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProviderSpecificProperty {
    pub name: String,
    pub value: String,
}

/// One DNS record description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// Name the record is published under.
    pub dns_name: String,

    /// `A`, `CNAME`, `TXT`, ...
    pub record_type: String,

    /// Record values. For TXT records each target is one string.
    #[serde(default)]
    pub targets: Vec<String>,

    #[serde(rename = "recordTTL", default, skip_serializing_if = "Option::is_none")]
    pub record_ttl: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_identifier: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provider_specific: Vec<ProviderSpecificProperty>,
}

impl Endpoint {
    /// TXT record with a single value.
    pub fn txt(dns_name: impl Into<String>, value: impl Into<String>) -> Self {
        Endpoint {
            dns_name: dns_name.into(),
            record_type: RECORD_TYPE_TXT.to_owned(),
            targets: vec![value.into()],
            record_ttl: None,
            set_identifier: None,
            labels: BTreeMap::new(),
            provider_specific: Vec::new(),
        }
    }

    /// Returns true if the first target is exactly `key`.
    pub fn first_target_is(&self, key: &str) -> bool {
        self.targets.first().is_some_and(|target| target == key)
    }
}

/// Declared DNS state, picked up by the external synchronization controller.
///
/// # Example
///
/// ```yaml
/// apiVersion: se.quencer.io/v1alpha1
/// kind: DNSEndpoint
/// metadata:
///   generateName: dns01-challenge-
///   namespace: cert-manager
///   labels:
///     solver.se.quencer.io/dns-name: acme-challenge.example.com
///     solver.se.quencer.io/fqdn: acme-challenge.example.com
///     solver.se.quencer.io/zone: example.com
/// spec:
///   endpoints:
///     - dnsName: _acme-challenge.example.com
///       recordType: TXT
///       targets: ["tok123"]
/// ```
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "se.quencer.io",
    version = "v1alpha1",
    kind = "DNSEndpoint",
    root = "DnsEndpoint",
    plural = "dnsendpoints",
    namespaced,
    derive = "PartialEq"
)]
#[kube(status = "DnsEndpointStatus")]
pub struct DnsEndpointSpec {
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DnsEndpointStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl DnsEndpoint {
    /// Builds the object that publishes the TXT record of a challenge.
    ///
    /// The name is left for the cluster to generate, so concurrent challenges for the same FQDN
    /// never collide. Labels carry normalized names; the record name only loses its trailing dot.
    pub fn for_challenge(namespace: &str, ch: &ChallengeRequest) -> Self {
        let labels = BTreeMap::from([
            (
                DNS_NAME_LABEL.to_owned(),
                normalize_label_value(&ch.dns_name).to_owned(),
            ),
            (
                FQDN_LABEL.to_owned(),
                normalize_label_value(&ch.resolved_fqdn).to_owned(),
            ),
            (
                ZONE_LABEL.to_owned(),
                normalize_label_value(&ch.resolved_zone).to_owned(),
            ),
        ]);

        DnsEndpoint {
            metadata: ObjectMeta {
                generate_name: Some(GENERATE_NAME_PREFIX.to_owned()),
                namespace: Some(namespace.to_owned()),
                labels: Some(labels),
                ..Default::default()
            },
            spec: DnsEndpointSpec {
                endpoints: vec![Endpoint::txt(trim_root_dot(&ch.resolved_fqdn), &ch.key)],
            },
            status: None,
        }
    }

    /// Cluster assigned name, if known.
    pub fn name(&self) -> Option<&str> {
        self.metadata.name.as_deref()
    }

    /// Returns true if any TXT endpoint of this object publishes `key` as its first target.
    pub fn carries_key(&self, key: &str) -> bool {
        self.spec
            .endpoints
            .iter()
            .filter(|ep| ep.record_type == RECORD_TYPE_TXT)
            .any(|ep| ep.first_target_is(key))
    }
}
