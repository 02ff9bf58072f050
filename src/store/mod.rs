//! Access to the object store holding [`DnsEndpoint`] objects.

use std::future::Future;

use crate::{api::DnsEndpoint, label::LabelSelector};

mod cluster;

pub use self::cluster::ClusterStore;

/// The three store operations the solver needs.
///
/// Errors are returned as reported by the store. Store failures should carry a [`kube::Error`]
/// so callers can inspect the API response.
pub trait EndpointStore {
    /// Creates `endpoint` in `namespace` and returns the stored object, including its generated
    /// name.
    fn create(
        &self,
        namespace: &str,
        endpoint: &DnsEndpoint,
    ) -> impl Future<Output = eyre::Result<DnsEndpoint>> + Send;

    /// Lists objects in `namespace` whose labels satisfy `selector`.
    fn list(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> impl Future<Output = eyre::Result<Vec<DnsEndpoint>>> + Send;

    /// Deletes the object called `name` in `namespace`.
    fn delete(&self, namespace: &str, name: &str)
        -> impl Future<Output = eyre::Result<()>> + Send;
}

/// Returns the API response carried by a store error, if there is one.
pub fn api_error(err: &eyre::Report) -> Option<&kube::core::ErrorResponse> {
    match err.downcast_ref::<kube::Error>()? {
        kube::Error::Api(resp) => Some(resp),
        _ => None,
    }
}

/// Returns true if the store reported that the object does not exist.
pub fn is_not_found(err: &eyre::Report) -> bool {
    api_error(err).is_some_and(|resp| resp.code == 404)
}
