//! Labels attached to DNSEndpoint objects and the selector used to find them again.
//!
//! Labels are an index, not an identity. Several objects may share the same `fqdn` label when
//! concurrent orders target the same name; the TXT value decides which one belongs to a challenge.

use std::fmt;

/// Label holding the normalized domain being validated.
pub const DNS_NAME_LABEL: &str = "solver.se.quencer.io/dns-name";

/// Label holding the normalized challenge FQDN. Used by clean up to narrow candidates.
pub const FQDN_LABEL: &str = "solver.se.quencer.io/fqdn";

/// Label holding the normalized zone owning the FQDN.
pub const ZONE_LABEL: &str = "solver.se.quencer.io/zone";

/// Strips a single trailing `.` (the DNS root), if present.
pub fn trim_root_dot(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}

/// Turns a DNS name into a label-safe value.
///
/// Strips one trailing `.` and then one leading `_`. Only a single character is removed at each
/// end, so `__acme` keeps one underscore.
pub fn normalize_label_value(name: &str) -> &str {
    let name = trim_root_dot(name);
    name.strip_prefix('_').unwrap_or(name)
}

/// Equality-based selector on a single label, rendered as `key=value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSelector {
    key: String,
    value: String,
}

impl LabelSelector {
    /// Selector matching objects whose label `key` equals `value`.
    pub fn eq(key: impl Into<String>, value: impl Into<String>) -> Self {
        LabelSelector {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}
