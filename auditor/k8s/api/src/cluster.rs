use crate::{Namespace, NetworkPolicy, Pod, Result, ServiceAccount};
use kube::api::{Api, ListParams};
use serde::de::DeserializeOwned;
use tracing::trace;

/// Read-only access to the cluster resources an audit inspects.
#[async_trait::async_trait]
pub trait ClusterApi: Send + Sync {
    async fn list_namespaces(&self) -> Result<Vec<Namespace>>;

    async fn list_pods(&self, ns: &str) -> Result<Vec<Pod>>;

    async fn list_service_accounts(&self, ns: &str) -> Result<Vec<ServiceAccount>>;

    async fn list_network_policies(&self, ns: &str) -> Result<Vec<NetworkPolicy>>;

    /// Returns the API server's version, confirming that the cluster is reachable.
    async fn version(&self) -> Result<String>;
}

/// A [`ClusterApi`] backed by a Kubernetes API client.
#[derive(Clone)]
pub struct KubeCluster {
    client: kube::Client,
    page_size: u32,
}

// === impl KubeCluster ===

impl KubeCluster {
    pub const DEFAULT_PAGE_SIZE: u32 = 500;

    pub fn new(client: kube::Client) -> Self {
        Self {
            client,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Lists every object, following continue tokens until the server reports the last page.
    async fn list_all<K>(&self, api: Api<K>) -> Result<Vec<K>>
    where
        K: Clone + std::fmt::Debug + DeserializeOwned,
    {
        let mut params = ListParams::default().limit(self.page_size);
        let mut items = Vec::new();
        loop {
            let page = api.list(&params).await?;
            trace!(items = page.items.len(), "Listed page");
            items.extend(page.items);
            match page.metadata.continue_ {
                Some(token) if !token.is_empty() => {
                    params = params.continue_token(&token);
                }
                _ => return Ok(items),
            }
        }
    }
}

#[async_trait::async_trait]
impl ClusterApi for KubeCluster {
    async fn list_namespaces(&self) -> Result<Vec<Namespace>> {
        self.list_all(Api::all(self.client.clone())).await
    }

    async fn list_pods(&self, ns: &str) -> Result<Vec<Pod>> {
        self.list_all(Api::namespaced(self.client.clone(), ns))
            .await
    }

    async fn list_service_accounts(&self, ns: &str) -> Result<Vec<ServiceAccount>> {
        self.list_all(Api::namespaced(self.client.clone(), ns))
            .await
    }

    async fn list_network_policies(&self, ns: &str) -> Result<Vec<NetworkPolicy>> {
        self.list_all(Api::namespaced(self.client.clone(), ns))
            .await
    }

    async fn version(&self) -> Result<String> {
        let info = self.client.apiserver_version().await?;
        Ok(info.git_version)
    }
}

impl std::fmt::Debug for KubeCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeCluster")
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}
