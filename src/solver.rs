use std::future::Future;

use eyre::WrapErr as _;

use crate::{
    api::{ChallengeRequest, DnsEndpoint},
    label::{normalize_label_value, LabelSelector, FQDN_LABEL},
    store::{self, ClusterStore, EndpointStore},
};

/// What the dispatcher of DNS-01 challenges calls into.
///
/// The dispatcher owns retries and propagation checks. Implementations only make the record
/// appear or disappear and report the first error they hit.
pub trait Solver {
    /// Identity advertised to the dispatcher.
    fn name(&self) -> &str;

    /// Makes the TXT record of `ch` resolvable.
    fn present(&self, ch: &ChallengeRequest) -> impl Future<Output = eyre::Result<()>> + Send;

    /// Removes the TXT record of `ch`. Succeeds when there is nothing to remove.
    fn clean_up(&self, ch: &ChallengeRequest) -> impl Future<Output = eyre::Result<()>> + Send;
}

/// Solves DNS-01 challenges by declaring TXT records as [`DnsEndpoint`] objects.
///
/// Actual publication is left to the DNS synchronization controller watching those objects. Each
/// present creates a new object with a store generated name, so concurrent orders for the same
/// FQDN never overwrite each other. Clean up finds candidates by the `fqdn` label and deletes
/// only those publishing the challenge's key.
///
/// ```no_run
/// use dns01::{api::ChallengeRequest, ChallengeBridge, Solver as _};
///
/// async fn solve(ch: &ChallengeRequest) -> eyre::Result<()> {
///     let bridge = ChallengeBridge::in_cluster("sequencer", "cert-manager")?;
///
///     bridge.present(ch).await?;
///     // ... let the ACME server validate ...
///     bridge.clean_up(ch).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ChallengeBridge<S = ClusterStore> {
    name: String,
    namespace: String,
    store: S,
}

impl ChallengeBridge<ClusterStore> {
    /// Connects to the API server described by `config`.
    ///
    /// Fails if the API client cannot be set up; the bridge is unusable without it. Must be called
    /// from within a Tokio runtime.
    pub fn initialize(
        name: impl Into<String>,
        namespace: impl Into<String>,
        config: kube::Config,
    ) -> eyre::Result<Self> {
        let store = ClusterStore::new(config)?;
        Ok(ChallengeBridge::new(name, namespace, store))
    }

    /// Connects to the API server of the cluster this process runs in, using the mounted service
    /// account.
    pub fn in_cluster(
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> eyre::Result<Self> {
        let config =
            kube::Config::incluster().wrap_err("Failed to load in-cluster configuration")?;
        ChallengeBridge::initialize(name, namespace, config)
    }
}

impl<S: EndpointStore> ChallengeBridge<S> {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, store: S) -> Self {
        ChallengeBridge {
            name: name.into(),
            namespace: namespace.into(),
            store,
        }
    }

    /// Namespace the [`DnsEndpoint`] objects are kept in.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns a reference to the store client.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates one [`DnsEndpoint`] publishing the challenge key.
    ///
    /// Not idempotent: presenting the same request twice creates two objects.
    pub async fn present(&self, ch: &ChallengeRequest) -> eyre::Result<()> {
        ch.validate()?;

        let endpoint = DnsEndpoint::for_challenge(&self.namespace, ch);
        let created = self.store.create(&self.namespace, &endpoint).await?;

        log::info!(
            "Presented TXT record for {} as {}/{}",
            ch.resolved_fqdn,
            self.namespace,
            created.name().unwrap_or("<unnamed>"),
        );

        Ok(())
    }

    /// Deletes every [`DnsEndpoint`] with a matching `fqdn` label that publishes the challenge
    /// key.
    ///
    /// Finding nothing to delete is a success. The first failing list or delete aborts; objects
    /// deleted before it stay deleted. Objects already gone by the time they are deleted count
    /// as deleted.
    pub async fn clean_up(&self, ch: &ChallengeRequest) -> eyre::Result<()> {
        ch.validate()?;

        let selector = LabelSelector::eq(FQDN_LABEL, normalize_label_value(&ch.resolved_fqdn));
        let candidates = self.store.list(&self.namespace, &selector).await?;

        log::debug!(
            "Found {} candidate objects for {selector}",
            candidates.len()
        );

        let mut deleted = 0;

        for endpoint in candidates.iter().filter(|ep| ep.carries_key(&ch.key)) {
            let Some(name) = endpoint.name() else {
                log::warn!("Skipping object without a name for {}", ch.resolved_fqdn);
                continue;
            };

            match self.store.delete(&self.namespace, name).await {
                Ok(()) => {
                    log::info!("Cleaned up TXT record {}/{name}", self.namespace);
                }

                Err(err) if store::is_not_found(&err) => {
                    log::debug!("Object {}/{name} already deleted", self.namespace);
                }

                Err(err) => return Err(err),
            }

            deleted += 1;
        }

        if deleted == 0 {
            log::debug!("No objects carry the key for {}", ch.resolved_fqdn);
        }

        Ok(())
    }
}

impl<S> Solver for ChallengeBridge<S>
where
    S: EndpointStore + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn present(&self, ch: &ChallengeRequest) -> eyre::Result<()> {
        ChallengeBridge::present(self, ch).await
    }

    async fn clean_up(&self, ch: &ChallengeRequest) -> eyre::Result<()> {
        ChallengeBridge::clean_up(self, ch).await
    }
}

#[cfg(test)]
mod tests {
    use kube::{core::ErrorResponse, ResourceExt as _};
    use parking_lot::Mutex;

    use super::*;
    use crate::{
        api::{DnsEndpointSpec, Endpoint},
        label::{DNS_NAME_LABEL, ZONE_LABEL},
        store::api_error,
        test::FORBIDDEN_NAMESPACE,
    };

    const NAMESPACE: &str = "cert-manager";

    fn request(key: &str) -> ChallengeRequest {
        ChallengeRequest::new(
            "_acme-challenge.example.com.",
            "_acme-challenge.example.com.",
            "example.com.",
            key,
        )
    }

    fn bridge(server: &crate::test::TestServer) -> ChallengeBridge {
        ChallengeBridge::initialize("sequencer", NAMESPACE, server.config()).unwrap()
    }

    #[tokio::test]
    async fn test_present_creates_one_object() {
        let server = crate::test::with_api_server();
        let bridge = bridge(&server);

        bridge.present(&request("tok123")).await.unwrap();

        let objects = server.objects();
        assert_eq!(objects.len(), 1);

        let ep = &objects[0];
        assert_eq!(ep.metadata.namespace.as_deref(), Some(NAMESPACE));
        assert_eq!(ep.labels()[DNS_NAME_LABEL], "acme-challenge.example.com");
        assert_eq!(ep.labels()[FQDN_LABEL], "acme-challenge.example.com");
        assert_eq!(ep.labels()[ZONE_LABEL], "example.com");

        let record = &ep.spec.endpoints[0];
        assert_eq!(record.dns_name, "_acme-challenge.example.com");
        assert_eq!(record.targets, ["tok123"]);
    }

    #[tokio::test]
    async fn test_present_twice_creates_distinct_objects() {
        let server = crate::test::with_api_server();
        let bridge = bridge(&server);

        bridge.present(&request("tok-a")).await.unwrap();
        bridge.present(&request("tok-b")).await.unwrap();

        let selector = LabelSelector::eq(FQDN_LABEL, "acme-challenge.example.com");
        let items = bridge.store().list(NAMESPACE, &selector).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_ne!(items[0].name(), items[1].name());
    }

    #[tokio::test]
    async fn test_present_same_request_twice_is_not_deduplicated() {
        let server = crate::test::with_api_server();
        let bridge = bridge(&server);

        bridge.present(&request("tok123")).await.unwrap();
        bridge.present(&request("tok123")).await.unwrap();
        assert_eq!(server.objects().len(), 2);

        // both carry the key, so both go
        bridge.clean_up(&request("tok123")).await.unwrap();
        assert!(server.objects().is_empty());
    }

    #[tokio::test]
    async fn test_clean_up_deletes_only_matching_key() {
        let server = crate::test::with_api_server();
        let bridge = bridge(&server);

        bridge.present(&request("tok-a")).await.unwrap();
        bridge.present(&request("tok-b")).await.unwrap();

        bridge.clean_up(&request("tok-a")).await.unwrap();

        let objects = server.objects();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].spec.endpoints[0].targets, ["tok-b"]);
    }

    #[tokio::test]
    async fn test_clean_up_without_candidates() {
        let server = crate::test::with_api_server();
        let bridge = bridge(&server);

        bridge.clean_up(&request("tok123")).await.unwrap();
        assert!(server.objects().is_empty());
    }

    #[tokio::test]
    async fn test_clean_up_with_non_matching_target() {
        let server = crate::test::with_api_server();
        let bridge = bridge(&server);

        bridge.present(&request("tok-other")).await.unwrap();
        bridge.clean_up(&request("tok123")).await.unwrap();

        assert_eq!(server.objects().len(), 1);
    }

    #[tokio::test]
    async fn test_clean_up_ignores_other_fqdns() {
        let server = crate::test::with_api_server();
        let bridge = bridge(&server);

        let other = ChallengeRequest::new(
            "_acme-challenge.example.org.",
            "_acme-challenge.example.org.",
            "example.org.",
            "tok123",
        );
        bridge.present(&other).await.unwrap();
        bridge.clean_up(&request("tok123")).await.unwrap();

        assert_eq!(server.objects().len(), 1);
    }

    #[tokio::test]
    async fn test_present_then_clean_up() {
        let server = crate::test::with_api_server();
        let bridge = bridge(&server);
        let ch = request("tok123");

        bridge.present(&ch).await.unwrap();
        assert_eq!(server.objects().len(), 1);

        bridge.clean_up(&ch).await.unwrap();
        assert!(server.objects().is_empty());

        // cleaning up again is fine
        bridge.clean_up(&ch).await.unwrap();
    }

    #[tokio::test]
    async fn test_store_errors_are_surfaced() {
        let server = crate::test::with_api_server();
        let bridge =
            ChallengeBridge::initialize("sequencer", FORBIDDEN_NAMESPACE, server.config())
                .unwrap();

        let err = bridge.present(&request("tok123")).await.unwrap_err();
        assert_eq!(api_error(&err).unwrap().code, 403);

        let err = bridge.clean_up(&request("tok123")).await.unwrap_err();
        assert_eq!(api_error(&err).unwrap().reason, "Forbidden");
    }

    #[tokio::test]
    async fn test_in_cluster_outside_a_pod() {
        // only meaningful where no service account is mounted
        if std::env::var_os("KUBERNETES_SERVICE_HOST").is_some() {
            return;
        }

        let err = ChallengeBridge::in_cluster("sequencer", NAMESPACE).unwrap_err();
        assert!(err
            .to_string()
            .contains("Failed to load in-cluster configuration"));
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected() {
        let server = crate::test::with_api_server();
        let bridge = bridge(&server);

        let ch = request("");
        assert!(bridge.present(&ch).await.is_err());
        assert!(bridge.clean_up(&ch).await.is_err());
        assert!(server.objects().is_empty());
    }

    #[tokio::test]
    async fn test_solver_trait() {
        async fn run<T: Solver>(solver: &T, ch: &ChallengeRequest) -> eyre::Result<()> {
            solver.present(ch).await?;
            solver.clean_up(ch).await
        }

        let server = crate::test::with_api_server();
        let bridge = bridge(&server);
        assert_eq!(Solver::name(&bridge), "sequencer");

        run(&bridge, &request("tok123")).await.unwrap();
        assert!(server.objects().is_empty());
    }

    fn api_failure(code: u16, reason: &str, message: &str) -> ErrorResponse {
        ErrorResponse {
            status: "Failure".to_owned(),
            message: message.to_owned(),
            reason: reason.to_owned(),
            code,
        }
    }

    /// Store double with scripted delete outcomes.
    #[derive(Default)]
    struct ScriptedStore {
        objects: Vec<DnsEndpoint>,
        fail_delete: Vec<(String, ErrorResponse)>,
        deleted: Mutex<Vec<String>>,
    }

    impl ScriptedStore {
        fn with_object(mut self, name: &str, key: &str) -> Self {
            self.objects.push(DnsEndpoint::new(
                name,
                DnsEndpointSpec {
                    endpoints: vec![Endpoint::txt("_acme-challenge.example.com", key)],
                },
            ));
            self
        }

        fn failing_delete(mut self, name: &str, resp: ErrorResponse) -> Self {
            self.fail_delete.push((name.to_owned(), resp));
            self
        }
    }

    impl EndpointStore for ScriptedStore {
        async fn create(&self, _: &str, endpoint: &DnsEndpoint) -> eyre::Result<DnsEndpoint> {
            Ok(endpoint.clone())
        }

        async fn list(&self, _: &str, _: &LabelSelector) -> eyre::Result<Vec<DnsEndpoint>> {
            Ok(self.objects.clone())
        }

        async fn delete(&self, _: &str, name: &str) -> eyre::Result<()> {
            if let Some((_, resp)) = self.fail_delete.iter().find(|(n, _)| n == name) {
                return Err(kube::Error::Api(resp.clone()).into());
            }

            self.deleted.lock().push(name.to_owned());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_delete_failure_aborts_without_rollback() {
        let store = ScriptedStore::default()
            .with_object("first", "tok123")
            .with_object("second", "tok123")
            .with_object("third", "tok123")
            .failing_delete("second", api_failure(500, "InternalError", "etcd down"));
        let bridge = ChallengeBridge::new("sequencer", NAMESPACE, store);

        let err = bridge.clean_up(&request("tok123")).await.unwrap_err();
        assert_eq!(api_error(&err).unwrap().reason, "InternalError");

        assert_eq!(*bridge.store().deleted.lock(), ["first"]);
    }

    #[tokio::test]
    async fn test_delete_not_found_is_tolerated() {
        let store = ScriptedStore::default()
            .with_object("gone", "tok123")
            .with_object("kept", "tok-other")
            .with_object("present", "tok123")
            .failing_delete("gone", api_failure(404, "NotFound", "gone"));
        let bridge = ChallengeBridge::new("sequencer", NAMESPACE, store);

        bridge.clean_up(&request("tok123")).await.unwrap();
        assert_eq!(*bridge.store().deleted.lock(), ["present"]);
    }

    #[tokio::test]
    async fn test_unnamed_candidates_are_skipped() {
        let mut store = ScriptedStore::default().with_object("named", "tok123");
        store.objects[0].metadata.name = None;
        let store = store.with_object("named", "tok123");
        let bridge = ChallengeBridge::new("sequencer", NAMESPACE, store);

        bridge.clean_up(&request("tok123")).await.unwrap();
        assert_eq!(*bridge.store().deleted.lock(), ["named"]);
    }
}
