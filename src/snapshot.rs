//! Data model for observed cluster state.
//!
//! A [`Snapshot`] is a point-in-time read of one remote resource or of a
//! selector-matched collection; its shape is fixed by how the fetch was
//! invoked (by name or by selector), and callers know which mode they asked
//! for. A [`DesiredState`] describes the condition a caller is waiting for
//! and is constructed per call and discarded afterwards.

use std::time::Duration;

use serde_json::Value;

use crate::config::CollectionPolicy;
use crate::error::{EngineError, Result};

/// A single resource as observed at one poll tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRecord {
    /// `.metadata.name` of the resource.
    pub name: String,
    /// `.status.phase`, when the resource reports one.
    pub phase: Option<String>,
    /// The full object, for derived-attribute lookups.
    pub raw: Value,
}

impl ResourceRecord {
    /// Build a record from a raw API or CLI JSON object.
    ///
    /// The object must carry `.metadata.name`; a missing name is a malformed
    /// response, not a transient condition.
    pub fn from_value(raw: Value) -> Result<Self> {
        let name = raw
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .ok_or_else(|| EngineError::MissingField {
                resource: "<unnamed>".to_string(),
                path: ".metadata.name".to_string(),
            })?
            .to_string();
        let phase = raw
            .pointer("/status/phase")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(Self { name, phase, raw })
    }

    /// Check whether this resource reports the given status phase.
    pub fn in_phase(&self, phase: &str) -> bool {
        self.phase.as_deref() == Some(phase)
    }
}

/// A point-in-time read of remote state.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    /// A single resource, fetched by name.
    Resource(ResourceRecord),
    /// A collection of resources, fetched by label selector.
    Collection(Vec<ResourceRecord>),
}

impl Snapshot {
    /// The records in this snapshot (one for a named fetch).
    pub fn items(&self) -> &[ResourceRecord] {
        match self {
            Snapshot::Resource(record) => std::slice::from_ref(record),
            Snapshot::Collection(items) => items,
        }
    }

    /// Whether the snapshot observed nothing.
    pub fn is_empty(&self) -> bool {
        matches!(self, Snapshot::Collection(items) if items.is_empty())
    }

    /// Count the records satisfying the given status phase.
    pub fn count_in_phase(&self, phase: &str) -> usize {
        self.items().iter().filter(|r| r.in_phase(phase)).count()
    }
}

/// How a fetch addresses its target. Exactly one of name or selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Fetch a single resource by name.
    Name(String),
    /// Fetch the collection matching a label selector.
    Selector(String),
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Name(name) => write!(f, "{}", name),
            Target::Selector(selector) => write!(f, "{}", selector),
        }
    }
}

/// The condition a caller is waiting for.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredState {
    /// Resource kind to fetch (e.g. `Pod`).
    pub resource_kind: String,
    /// Namespace to fetch from.
    pub namespace: String,
    /// Name or selector addressing the target.
    pub target: Target,
    /// Status phase that counts as converged (e.g. `Running`).
    pub target_condition: String,
    /// Expected member count; only meaningful in collection mode.
    pub expected_count: Option<usize>,
    /// When set, convergence means the target is gone.
    pub to_delete: bool,
    /// Collection-mode counting policy.
    pub policy: CollectionPolicy,
}

impl DesiredState {
    /// Wait for a named resource to reach a status phase.
    pub fn named(
        resource_kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        target_condition: impl Into<String>,
    ) -> Self {
        Self {
            resource_kind: resource_kind.into(),
            namespace: namespace.into(),
            target: Target::Name(name.into()),
            target_condition: target_condition.into(),
            expected_count: None,
            to_delete: false,
            policy: CollectionPolicy::default(),
        }
    }

    /// Wait for a selector-matched collection to reach a status phase.
    pub fn selected(
        resource_kind: impl Into<String>,
        namespace: impl Into<String>,
        selector: impl Into<String>,
        target_condition: impl Into<String>,
    ) -> Self {
        Self {
            resource_kind: resource_kind.into(),
            namespace: namespace.into(),
            target: Target::Selector(selector.into()),
            target_condition: target_condition.into(),
            expected_count: None,
            to_delete: false,
            policy: CollectionPolicy::default(),
        }
    }

    /// Wait for the target to be gone.
    pub fn deletion(
        resource_kind: impl Into<String>,
        namespace: impl Into<String>,
        target: Target,
    ) -> Self {
        Self {
            resource_kind: resource_kind.into(),
            namespace: namespace.into(),
            target,
            target_condition: String::new(),
            expected_count: None,
            to_delete: true,
            policy: CollectionPolicy::default(),
        }
    }

    /// Set the expected member count (collection mode only).
    pub fn with_expected_count(mut self, count: usize) -> Self {
        self.expected_count = Some(count);
        self
    }

    /// Set the collection-mode counting policy.
    pub fn with_policy(mut self, policy: CollectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Human-readable description of what is being polled, used in timeout
    /// diagnostics.
    pub fn subject(&self) -> String {
        format!(
            "{} {} in {}",
            self.resource_kind, self.target, self.namespace
        )
    }

    /// The condition being waited for, used in timeout diagnostics.
    pub fn condition(&self) -> String {
        if self.to_delete {
            "deleted".to_string()
        } else {
            match self.expected_count {
                Some(count) => format!("{} x {}", count, self.target_condition),
                None => self.target_condition.clone(),
            }
        }
    }
}

/// Outcome of driving a [`DesiredState`] through the sampler.
#[derive(Debug, Clone)]
pub struct ConvergenceResult {
    /// Whether the condition held before the deadline.
    pub converged: bool,
    /// The last snapshot observed, kept for diagnostics.
    pub last_snapshot: Option<Snapshot>,
    /// Time spent polling.
    pub elapsed: Duration,
    /// Number of fetch calls issued.
    pub calls: u32,
}
