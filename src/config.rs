//! Engine configuration.
//!
//! Configuration is an explicit, immutable value constructed once and passed
//! by reference (or `Arc`) into every component that needs it. No component
//! reads ambient global state.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{EngineError, Result};

/// Default interval between poll ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Default convergence deadline.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(60);

/// Timing for a deadline-bounded polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Time between consecutive fetches.
    pub interval: Duration,
    /// Deadline after which polling stops.
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

impl PollConfig {
    /// Create a poll configuration with explicit timing.
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Validate the timing invariants (`interval > 0`, `timeout > 0`).
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(EngineError::InvalidConfig {
                reason: "poll interval must be greater than zero".to_string(),
            });
        }
        if self.timeout.is_zero() {
            return Err(EngineError::InvalidConfig {
                reason: "poll timeout must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// How collection-mode convergence treats the expected count.
///
/// The reference behavior layered a full-unanimity requirement on top of the
/// count check. Both readings are preserved as an explicit choice rather
/// than guessing which was intended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionPolicy {
    /// Converged iff the matching count equals `expected_count` **and**
    /// every listed item matches (reference behavior).
    #[default]
    StrictUnanimous,
    /// Converged iff the matching count equals `expected_count`, tolerating
    /// non-matching leftover items in the listing.
    CountOnly,
}

/// Which backend executes fetch/mutate/delete operations.
///
/// A closed, enumerated choice made once at construction time; there is no
/// runtime registry of backends.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum ExecutorConfig {
    /// Kubernetes API client (kube dynamic client).
    #[default]
    Api,
    /// CLI subprocess (`kubectl` or `oc`).
    Cli {
        /// Binary to invoke.
        binary: String,
    },
}

/// Immutable engine configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Namespace the storage cluster runs in.
    pub namespace: String,
    /// Name of the storage cluster's custom resources.
    pub cluster_name: String,
    /// Polling timing used by topology changes unless overridden.
    pub poll: PollConfig,
    /// Collection-mode convergence policy.
    pub policy: CollectionPolicy,
    /// Executor backend selection.
    pub executor: ExecutorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            namespace: "rook-ceph".to_string(),
            cluster_name: "rook-ceph".to_string(),
            poll: PollConfig::default(),
            policy: CollectionPolicy::default(),
            executor: ExecutorConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(EngineError::InvalidConfig {
                reason: "namespace must not be empty".to_string(),
            });
        }
        if self.cluster_name.is_empty() {
            return Err(EngineError::InvalidConfig {
                reason: "cluster name must not be empty".to_string(),
            });
        }
        if let ExecutorConfig::Cli { binary } = &self.executor
            && binary.is_empty()
        {
            return Err(EngineError::InvalidConfig {
                reason: "cli executor binary must not be empty".to_string(),
            });
        }
        self.poll.validate()
    }
}
