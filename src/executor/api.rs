//! API-client executor backend.
//!
//! Talks to the API server through the kube dynamic client so any resource
//! kind the engine is pointed at (pods, Ceph custom resources) goes through
//! one code path. A 404 from the API server maps to
//! [`EngineError::NotFound`]; every other API error is a
//! [`EngineError::CommandFailed`].

use kube::Client;
use kube::api::{Api, DeleteParams, DynamicObject, ListParams, Patch, PatchParams};
use kube::core::{ApiResource, GroupVersionKind};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{EngineError, Result};
use crate::snapshot::{ResourceRecord, Snapshot, Target};

/// Executor backed by the Kubernetes API.
#[derive(Clone)]
pub struct ApiExecutor {
    client: Client,
}

impl std::fmt::Debug for ApiExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiExecutor").finish_non_exhaustive()
    }
}

impl ApiExecutor {
    /// Create an executor over an existing client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Resolve a resource kind to a namespaced dynamic API.
    fn dynamic_api(&self, kind: &str, namespace: &str) -> Result<Api<DynamicObject>> {
        let (group, version) = match kind {
            "Pod" | "Service" | "ConfigMap" | "PersistentVolumeClaim" => ("", "v1"),
            "Deployment" | "StatefulSet" => ("apps", "v1"),
            "CephCluster" | "CephFilesystem" | "CephObjectStore" | "CephBlockPool" => {
                ("ceph.rook.io", "v1")
            }
            other => {
                return Err(EngineError::CommandFailed {
                    operation: format!("resolve kind {}", other),
                    detail: "kind is not mapped to an API group/version".to_string(),
                });
            }
        };
        let resource = ApiResource::from_gvk(&GroupVersionKind::gvk(group, version, kind));
        Ok(Api::namespaced_with(self.client.clone(), namespace, &resource))
    }

    fn record(object: &DynamicObject) -> Result<ResourceRecord> {
        ResourceRecord::from_value(serde_json::to_value(object)?)
    }

    fn classify(err: kube::Error, operation: String, kind: &str, target: &str) -> EngineError {
        if let kube::Error::Api(response) = &err
            && response.code == 404
        {
            return EngineError::NotFound {
                kind: kind.to_string(),
                target: target.to_string(),
            };
        }
        EngineError::CommandFailed {
            operation,
            detail: err.to_string(),
        }
    }

    /// Read one resource or a selector-matched collection.
    #[instrument(skip(self))]
    pub async fn fetch(&self, kind: &str, namespace: &str, target: &Target) -> Result<Snapshot> {
        let api = self.dynamic_api(kind, namespace)?;
        match target {
            Target::Name(name) => {
                let object = api.get(name).await.map_err(|err| {
                    Self::classify(err, format!("get {}/{}", kind, name), kind, name)
                })?;
                Ok(Snapshot::Resource(Self::record(&object)?))
            }
            Target::Selector(selector) => {
                let params = ListParams::default().labels(selector);
                let listing = api.list(&params).await.map_err(|err| {
                    Self::classify(err, format!("list {} by {}", kind, selector), kind, selector)
                })?;
                let items = listing
                    .items
                    .iter()
                    .map(Self::record)
                    .collect::<Result<Vec<_>>>()?;
                debug!(kind, selector, count = items.len(), "listed resources");
                Ok(Snapshot::Collection(items))
            }
        }
    }

    /// Apply a JSON merge patch to a resource's spec.
    #[instrument(skip(self, delta))]
    pub async fn mutate(
        &self,
        kind: &str,
        namespace: &str,
        name: &str,
        delta: Value,
    ) -> Result<Snapshot> {
        let api = self.dynamic_api(kind, namespace)?;
        let object = api
            .patch(name, &PatchParams::default(), &Patch::Merge(&delta))
            .await
            .map_err(|err| Self::classify(err, format!("patch {}/{}", kind, name), kind, name))?;
        Ok(Snapshot::Resource(Self::record(&object)?))
    }

    /// Delete a resource.
    #[instrument(skip(self))]
    pub async fn delete(&self, kind: &str, namespace: &str, name: &str) -> Result<()> {
        let api = self.dynamic_api(kind, namespace)?;
        api.delete(name, &DeleteParams::default())
            .await
            .map_err(|err| Self::classify(err, format!("delete {}/{}", kind, name), kind, name))?;
        Ok(())
    }
}
