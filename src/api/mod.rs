//! JSON payloads exchanged with the dispatcher and the cluster.
//!
//! [`DnsEndpoint`] is the custom resource watched by the DNS synchronization controller. Object
//! metadata, lists, and error statuses use the types of the `kube` and `k8s-openapi` crates.

mod challenge;
mod endpoint;

pub use self::{
    challenge::{ChallengeAction, ChallengeRequest},
    endpoint::{
        DnsEndpoint, DnsEndpointSpec, DnsEndpointStatus, Endpoint, ProviderSpecificProperty,
        GENERATE_NAME_PREFIX, RECORD_TYPE_TXT,
    },
};
