//! Kubernetes-backed lister.
//!
//! Uses dynamic API resources so the Hive CRD does not need generated
//! bindings. Label selectors are pushed down to the API server.

use async_trait::async_trait;
use kube::api::{Api, ApiResource, DynamicObject, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::GroupVersionKind;
use kube::{Client, Config};
use tracing::{debug, instrument};

use super::{ListError, ResourceLister};
use crate::resource::{LabelSelector, ResourceItem, ResourceKind};

/// Lists objects across all namespaces of the connected cluster.
#[derive(Clone)]
pub struct KubeLister {
    client: Client,
}

impl KubeLister {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connects using the ambient configuration (in-cluster service account
    /// or `~/.kube/config`), optionally pinned to a kubeconfig context.
    pub async fn connect(context: Option<&str>) -> anyhow::Result<Self> {
        let client = match context {
            None => Client::try_default().await?,
            Some(ctx) => {
                let kubeconfig = Kubeconfig::read()?;
                let options = KubeConfigOptions {
                    context: Some(ctx.to_string()),
                    ..Default::default()
                };
                let config = Config::from_custom_kubeconfig(kubeconfig, &options).await?;
                Client::try_from(config)?
            }
        };
        debug!("Kubernetes client initialized");
        Ok(Self::new(client))
    }

    fn api_for(&self, kind: ResourceKind) -> Api<DynamicObject> {
        Api::all_with(self.client.clone(), &api_resource(kind))
    }
}

/// Dynamic API coordinates for a tracked kind.
pub fn api_resource(kind: ResourceKind) -> ApiResource {
    let gvk = GroupVersionKind::gvk(kind.group(), kind.version(), kind.kind_name());
    ApiResource::from_gvk_with_plural(&gvk, kind.plural())
}

/// Flattens a dynamic object into the fields the predicates read.
pub fn item_from_object(obj: DynamicObject) -> ResourceItem {
    let installed = obj
        .data
        .get("status")
        .and_then(|status| status.get("installed"))
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    ResourceItem {
        name: obj.metadata.name.unwrap_or_default(),
        namespace: obj.metadata.namespace,
        labels: obj.metadata.labels.unwrap_or_default(),
        installed,
    }
}

#[async_trait]
impl ResourceLister for KubeLister {
    #[instrument(skip(self))]
    async fn list(
        &self,
        kind: ResourceKind,
        selector: Option<&LabelSelector>,
    ) -> Result<Vec<ResourceItem>, ListError> {
        let mut params = ListParams::default();
        if let Some(selector) = selector {
            params = params.labels(&selector.to_string());
        }

        let list = self
            .api_for(kind)
            .list(&params)
            .await
            .map_err(|e| ListError::backend(kind, e))?;

        Ok(list.items.into_iter().map(item_from_object).collect())
    }

    fn describe(&self) -> String {
        "kubernetes".to_string()
    }
}
