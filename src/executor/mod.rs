//! Executor backends for the engine's three-operation boundary.
//!
//! The engine observes and mutates the remote cluster exclusively through
//! [`ClusterOps`]: a fetch by name or selector, a partial spec mutation, and
//! a deletion. Which transport implements those operations is a closed,
//! enumerated choice made once at construction time from [`ExecutorConfig`];
//! there is no runtime backend registry.
//!
//! - [`ApiExecutor`]: kube dynamic client against the API server
//! - [`CliExecutor`]: `kubectl`/`oc` subprocess with JSON output

pub mod api;
pub mod cli;

use std::future::Future;

use kube::Client;
use serde_json::Value;

use crate::config::{EngineConfig, ExecutorConfig};
use crate::error::{EngineError, Result};
use crate::snapshot::{Snapshot, Target};

pub use api::ApiExecutor;
pub use cli::CliExecutor;

/// The fetch/mutate/delete boundary every engine component is written
/// against.
///
/// `fetch` must be side-effect-free; the sampler may invoke it an unbounded
/// number of times. Implementations raise [`EngineError::NotFound`] when the
/// target does not exist and [`EngineError::CommandFailed`] for any other
/// transport failure.
pub trait ClusterOps: Send + Sync {
    /// Read one resource (by name) or a collection (by selector).
    fn fetch(
        &self,
        kind: &str,
        namespace: &str,
        target: &Target,
    ) -> impl Future<Output = Result<Snapshot>> + Send;

    /// Apply a partial update to a resource's desired spec.
    fn mutate(
        &self,
        kind: &str,
        namespace: &str,
        name: &str,
        delta: Value,
    ) -> impl Future<Output = Result<Snapshot>> + Send;

    /// Delete a resource. Deletion convergence is observed through
    /// subsequent fetches returning empty, never through this call.
    fn delete(
        &self,
        kind: &str,
        namespace: &str,
        name: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// The closed set of executor backends.
#[derive(Debug, Clone)]
pub enum Executor {
    /// Kubernetes API client.
    Api(ApiExecutor),
    /// CLI subprocess.
    Cli(CliExecutor),
}

impl Executor {
    /// Build the backend selected by the configuration.
    pub async fn from_config(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        match &config.executor {
            ExecutorConfig::Api => {
                let client =
                    Client::try_default()
                        .await
                        .map_err(|err| EngineError::CommandFailed {
                            operation: "connect to cluster".to_string(),
                            detail: err.to_string(),
                        })?;
                Ok(Executor::Api(ApiExecutor::new(client)))
            }
            ExecutorConfig::Cli { binary } => Ok(Executor::Cli(CliExecutor::new(binary.clone()))),
        }
    }
}

impl ClusterOps for Executor {
    fn fetch(
        &self,
        kind: &str,
        namespace: &str,
        target: &Target,
    ) -> impl Future<Output = Result<Snapshot>> + Send {
        async move {
            match self {
                Executor::Api(backend) => backend.fetch(kind, namespace, target).await,
                Executor::Cli(backend) => backend.fetch(kind, namespace, target).await,
            }
        }
    }

    fn mutate(
        &self,
        kind: &str,
        namespace: &str,
        name: &str,
        delta: Value,
    ) -> impl Future<Output = Result<Snapshot>> + Send {
        async move {
            match self {
                Executor::Api(backend) => backend.mutate(kind, namespace, name, delta).await,
                Executor::Cli(backend) => backend.mutate(kind, namespace, name, delta).await,
            }
        }
    }

    fn delete(
        &self,
        kind: &str,
        namespace: &str,
        name: &str,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            match self {
                Executor::Api(backend) => backend.delete(kind, namespace, name).await,
                Executor::Cli(backend) => backend.delete(kind, namespace, name).await,
            }
        }
    }
}
