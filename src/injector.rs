//! Failure injection.
//!
//! [`FailureInjector`] deletes one resource matching a role selector while
//! other work (typically a topology change) is in flight, to validate that
//! convergence still holds under injected churn. The injection itself is
//! deliberately not resilient: failing to find or delete a victim is a hard
//! error surfaced to the caller, never retried.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, instrument};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::executor::ClusterOps;
use crate::snapshot::Target;
use crate::topology::Role;

/// What an injection run did.
#[derive(Debug, Clone)]
pub struct InjectionReport {
    /// Name of the deleted resource.
    pub victim: String,
    /// Kind of the deleted resource.
    pub resource_kind: String,
    /// Selector the victim was picked from.
    pub selector: String,
}

/// Deletes one selector-matched resource, independently of any in-flight
/// convergence loop.
pub struct FailureInjector<E> {
    ops: Arc<E>,
    resource_kind: String,
    namespace: String,
    selector: String,
}

impl<E: ClusterOps> FailureInjector<E> {
    /// Create an injector targeting a selector-matched resource class.
    pub fn new(
        ops: Arc<E>,
        resource_kind: impl Into<String>,
        namespace: impl Into<String>,
        selector: impl Into<String>,
    ) -> Self {
        Self {
            ops,
            resource_kind: resource_kind.into(),
            namespace: namespace.into(),
            selector: selector.into(),
        }
    }

    /// Create an injector targeting one pod of a Ceph daemon role.
    pub fn for_role(ops: Arc<E>, config: &EngineConfig, role: Role) -> Self {
        Self::new(ops, "Pod", config.namespace.clone(), role.label_selector())
    }

    /// Pick and delete one matching resource.
    ///
    /// An empty selector match or a failed delete is a hard error.
    #[instrument(skip(self), fields(kind = %self.resource_kind, selector = %self.selector))]
    pub async fn inject(&self) -> Result<InjectionReport> {
        let snapshot = self
            .ops
            .fetch(
                &self.resource_kind,
                &self.namespace,
                &Target::Selector(self.selector.clone()),
            )
            .await?;
        let victim = snapshot
            .items()
            .first()
            .map(|record| record.name.clone())
            .ok_or_else(|| EngineError::NotFound {
                kind: self.resource_kind.clone(),
                target: self.selector.clone(),
            })?;

        self.ops
            .delete(&self.resource_kind, &self.namespace, &victim)
            .await?;
        info!(victim = %victim, "injected failure");

        Ok(InjectionReport {
            victim,
            resource_kind: self.resource_kind.clone(),
            selector: self.selector.clone(),
        })
    }

    /// Run the injection on an independent task.
    ///
    /// The injector has no ordering relationship with any concurrently
    /// running convergence loop beyond what the remote cluster imposes.
    pub fn spawn(self) -> JoinHandle<Result<InjectionReport>>
    where
        E: 'static,
    {
        tokio::spawn(async move { self.inject().await })
    }
}
