use serde::{Deserialize, Serialize};

/// What the dispatcher wants done with a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeAction {
    Present,
    CleanUp,
}

/// A DNS-01 challenge as handed over by the dispatcher.
///
/// Only `dns_name`, `resolved_fqdn`, `resolved_zone`, and `key` are used by the solver. The
/// remaining fields are carried so the full payload can be deserialized and logged.
///
/// # Example JSON
///
/// ```json
/// {
///   "uid": "6b2e3c0a-1f55-4a8e-9a5e-2f8d0d1b7c33",
///   "action": "Present",
///   "type": "dns-01",
///   "dnsName": "example.com",
///   "key": "LoqXcYV8q5ONbJQxbmR7SCTNo3tiAXDfowyjxAjEuX0",
///   "resourceNamespace": "default",
///   "resolvedFQDN": "_acme-challenge.example.com.",
///   "resolvedZone": "example.com.",
///   "allowAmbientCredentials": false
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRequest {
    #[serde(default)]
    pub uid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ChallengeAction>,

    #[serde(rename = "type", default)]
    pub _type: String,

    /// Domain being validated. May carry a leading `_` or trailing `.`.
    pub dns_name: String,

    /// Expected TXT value. Opaque; never transformed.
    pub key: String,

    #[serde(default)]
    pub resource_namespace: String,

    /// Name the TXT record must be published under.
    #[serde(rename = "resolvedFQDN")]
    pub resolved_fqdn: String,

    /// Zone owning `resolved_fqdn`.
    pub resolved_zone: String,

    #[serde(default)]
    pub allow_ambient_credentials: bool,

    /// Solver specific configuration, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

impl ChallengeRequest {
    /// Request with the fields the solver needs.
    pub fn new(
        dns_name: impl Into<String>,
        resolved_fqdn: impl Into<String>,
        resolved_zone: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        ChallengeRequest {
            _type: "dns-01".to_owned(),
            dns_name: dns_name.into(),
            key: key.into(),
            resolved_fqdn: resolved_fqdn.into(),
            resolved_zone: resolved_zone.into(),
            ..Default::default()
        }
    }

    /// Checks the fields used by the solver are populated.
    pub fn validate(&self) -> eyre::Result<()> {
        let fields = [
            ("dnsName", &self.dns_name),
            ("resolvedFQDN", &self.resolved_fqdn),
            ("resolvedZone", &self.resolved_zone),
            ("key", &self.key),
        ];

        let missing = fields
            .iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(field, _)| *field)
            .collect::<Vec<_>>();

        if !missing.is_empty() {
            eyre::bail!(
                "Challenge request {:?} is missing: {}",
                self.uid,
                missing.join(", ")
            );
        }

        Ok(())
    }
}
