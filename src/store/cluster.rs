use eyre::WrapErr as _;
use kube::{
    api::{DeleteParams, ListParams, PostParams},
    Api, Client,
};

use crate::{api::DnsEndpoint, label::LabelSelector, store::EndpointStore};

/// [`DnsEndpoint`] objects kept by a Kubernetes API server.
///
/// Objects live under:
///
/// ```text
/// /apis/se.quencer.io/v1alpha1/namespaces/<namespace>/dnsendpoints
/// ```
#[derive(Clone)]
pub struct ClusterStore {
    client: Client,
}

impl ClusterStore {
    /// Builds the API client described by `config`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: kube::Config) -> eyre::Result<Self> {
        log::debug!("Store client for {}", config.cluster_url);

        let client = Client::try_from(config).wrap_err("Failed to build API client")?;
        Ok(ClusterStore { client })
    }

    /// Uses an already configured API client.
    pub fn from_client(client: Client) -> Self {
        ClusterStore { client }
    }

    fn api(&self, namespace: &str) -> Api<DnsEndpoint> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

impl std::fmt::Debug for ClusterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterStore")
            .field("default_namespace", &self.client.default_namespace())
            .finish_non_exhaustive()
    }
}

impl EndpointStore for ClusterStore {
    async fn create(&self, namespace: &str, endpoint: &DnsEndpoint) -> eyre::Result<DnsEndpoint> {
        log::debug!("Creating DNSEndpoint in {namespace}");

        match self
            .api(namespace)
            .create(&PostParams::default(), endpoint)
            .await
        {
            Ok(created) => Ok(created),

            // the object was accepted; only the response was unreadable
            Err(kube::Error::SerdeError(err)) => {
                log::warn!("Created DNSEndpoint in {namespace} but could not read it back: {err}");
                Ok(endpoint.clone())
            }

            Err(err) => Err(err.into()),
        }
    }

    async fn list(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> eyre::Result<Vec<DnsEndpoint>> {
        log::debug!("Listing DNSEndpoints in {namespace} with {selector}");

        let params = ListParams::default().labels(&selector.to_string());
        let list = self.api(namespace).list(&params).await?;
        log::trace!("Listed {} objects", list.items.len());

        Ok(list.items)
    }

    async fn delete(&self, namespace: &str, name: &str) -> eyre::Result<()> {
        log::debug!("Deleting DNSEndpoint {namespace}/{name}");

        self.api(namespace)
            .delete(name, &DeleteParams::default())
            .await?;

        Ok(())
    }
}
