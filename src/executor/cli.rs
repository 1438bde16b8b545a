//! CLI subprocess executor backend.
//!
//! Shells out to `kubectl` or `oc` with `-o json` and parses the output.
//! A "NotFound" server error on stderr maps to [`EngineError::NotFound`];
//! any other non-zero exit is a [`EngineError::CommandFailed`] carrying the
//! stderr for diagnosis.

use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::error::{EngineError, Result};
use crate::snapshot::{ResourceRecord, Snapshot, Target};

/// Executor backed by a CLI binary.
#[derive(Debug, Clone)]
pub struct CliExecutor {
    binary: String,
}

impl CliExecutor {
    /// Create an executor invoking the given binary (`kubectl`, `oc`).
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Run the binary and return stdout, classifying failures.
    async fn run(&self, args: &[&str], operation: &str, kind: &str, target: &str) -> Result<Vec<u8>> {
        debug!(binary = %self.binary, ?args, "running command");
        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|err| EngineError::CommandFailed {
                operation: operation.to_string(),
                detail: err.to_string(),
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            if stderr.contains("NotFound") {
                return Err(EngineError::NotFound {
                    kind: kind.to_string(),
                    target: target.to_string(),
                });
            }
            return Err(EngineError::CommandFailed {
                operation: operation.to_string(),
                detail: stderr,
            });
        }
        Ok(output.stdout)
    }

    fn parse(stdout: &[u8], operation: &str) -> Result<Value> {
        serde_json::from_slice(stdout).map_err(|err| EngineError::CommandFailed {
            operation: operation.to_string(),
            detail: format!("unparseable JSON output: {}", err),
        })
    }

    /// Read one resource or a selector-matched collection.
    #[instrument(skip(self))]
    pub async fn fetch(&self, kind: &str, namespace: &str, target: &Target) -> Result<Snapshot> {
        match target {
            Target::Name(name) => {
                let operation = format!("get {}/{}", kind, name);
                let stdout = self
                    .run(
                        &["get", kind, name, "-n", namespace, "-o", "json"],
                        &operation,
                        kind,
                        name,
                    )
                    .await?;
                let raw = Self::parse(&stdout, &operation)?;
                Ok(Snapshot::Resource(ResourceRecord::from_value(raw)?))
            }
            Target::Selector(selector) => {
                let operation = format!("list {} by {}", kind, selector);
                let stdout = self
                    .run(
                        &["get", kind, "-n", namespace, "-l", selector, "-o", "json"],
                        &operation,
                        kind,
                        selector,
                    )
                    .await?;
                let raw = Self::parse(&stdout, &operation)?;
                let items = raw
                    .pointer("/items")
                    .and_then(Value::as_array)
                    .ok_or_else(|| EngineError::CommandFailed {
                        operation: operation.clone(),
                        detail: "list output has no items field".to_string(),
                    })?
                    .iter()
                    .cloned()
                    .map(ResourceRecord::from_value)
                    .collect::<Result<Vec<_>>>()?;
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
        let operation = format!("patch {}/{}", kind, name);
        let patch = delta.to_string();
        let stdout = self
            .run(
                &[
                    "patch", kind, name, "-n", namespace, "--type", "merge", "-p", &patch, "-o",
                    "json",
                ],
                &operation,
                kind,
                name,
            )
            .await?;
        let raw = Self::parse(&stdout, &operation)?;
        Ok(Snapshot::Resource(ResourceRecord::from_value(raw)?))
    }

    /// Delete a resource.
    #[instrument(skip(self))]
    pub async fn delete(&self, kind: &str, namespace: &str, name: &str) -> Result<()> {
        let operation = format!("delete {}/{}", kind, name);
        self.run(
            &["delete", kind, name, "-n", namespace, "--wait=false"],
            &operation,
            kind,
            name,
        )
        .await?;
        Ok(())
    }
}
