//! Error types for the convergence engine.
//!
//! Defines the closed error taxonomy shared by the sampler, the condition
//! evaluator, the topology controller, and the executor backends. All
//! failures surface through these variants; nothing in the engine reports
//! a failure through an assertion.

use std::time::Duration;

use thiserror::Error;

use crate::snapshot::Snapshot;
use crate::topology::Role;

/// Error type for engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The fetched resource does not exist (yet). Transient: the sampler
    /// loop retries it until the deadline, and deletion-mode convergence
    /// treats it as success.
    #[error("{kind} {target} not found")]
    NotFound {
        /// Resource kind that was fetched.
        kind: String,
        /// Name or label selector that was fetched.
        target: String,
    },

    /// The deadline was reached before the condition held. Terminal.
    #[error("timed out waiting for {subject} to reach {condition} after {elapsed:?} ({calls} polls)")]
    Timeout {
        /// What was being polled (kind plus name/selector and namespace).
        subject: String,
        /// The condition that was never reached.
        condition: String,
        /// Time spent polling.
        elapsed: Duration,
        /// Number of fetch calls issued before giving up.
        calls: u32,
        /// The last snapshot observed before the deadline, for diagnosis.
        last: Option<Box<Snapshot>>,
    },

    /// A fetch/mutate/delete collaborator call failed outright. Terminal,
    /// propagated unchanged.
    #[error("command failed during {operation}: {detail}")]
    CommandFailed {
        /// The operation that was attempted.
        operation: String,
        /// Transport-level failure detail (API error or process stderr).
        detail: String,
    },

    /// A topology change did not converge before the deadline. Carries the
    /// role, the requested count, and what was last observed.
    #[error(
        "{role} count did not converge: requested {requested} (selector {selector}), last observed {last_observed} in target condition"
    )]
    Convergence {
        /// Role whose count was being changed.
        role: Role,
        /// The requested member count.
        requested: u32,
        /// Label selector used to poll the role's members.
        selector: String,
        /// Members satisfying the target condition in the last snapshot.
        last_observed: usize,
    },

    /// A nested field expected during topology verification is absent.
    #[error("resource {resource} is missing expected field {path}")]
    MissingField {
        /// Name of the resource the field was read from.
        resource: String,
        /// Dotted path of the absent field.
        path: String,
    },

    /// Configuration rejected at construction time.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What was wrong with the configuration.
        reason: String,
    },

    /// Serialization error while converting a raw object.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Check if this error indicates a not-found condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound { .. })
    }

    /// Check if this error is transient (retried by the sampler loop).
    pub fn is_transient(&self) -> bool {
        self.is_not_found()
    }

    /// Relabel the operation of a `CommandFailed` error. Other variants are
    /// returned unchanged.
    pub fn with_operation(self, operation: impl Into<String>) -> Self {
        match self {
            EngineError::CommandFailed { detail, .. } => EngineError::CommandFailed {
                operation: operation.into(),
                detail,
            },
            other => other,
        }
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
