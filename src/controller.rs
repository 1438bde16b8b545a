//! Topology change controller.
//!
//! [`TopologyController`] drives a complete member-count change for one
//! cluster role: patch the desired count on the role's custom resource,
//! poll the role's pods until the count converges, then re-fetch the member
//! list, verify health, and rebuild the in-memory topology view.
//!
//! The machine runs `Requested → Applying → Converging → Verified`, landing
//! in `Failed` on a rejected mutation, a convergence timeout, or a failed
//! verification. It never retries itself; a caller that wants retries
//! re-invokes [`TopologyController::apply_change`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::config::{CollectionPolicy, EngineConfig, PollConfig};
use crate::error::{EngineError, Result};
use crate::executor::ClusterOps;
use crate::sampler::Sampler;
use crate::snapshot::{DesiredState, Target};
use crate::topology::{ClusterTopology, Role, TopologyMember};

/// Status phase that counts as a healthy member.
const RUNNING_PHASE: &str = "Running";

/// Phases of one topology change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangePhase {
    /// Change requested, nothing issued yet.
    Requested,
    /// Mutating the role's desired count.
    Applying,
    /// Polling the role's members toward the requested count.
    Converging,
    /// Converged, verified, topology rebuilt. Terminal.
    Verified,
    /// Mutation rejected, deadline missed, or verification failed. Terminal.
    Failed,
}

impl fmt::Display for ChangePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangePhase::Requested => write!(f, "Requested"),
            ChangePhase::Applying => write!(f, "Applying"),
            ChangePhase::Converging => write!(f, "Converging"),
            ChangePhase::Verified => write!(f, "Verified"),
            ChangePhase::Failed => write!(f, "Failed"),
        }
    }
}

/// Summary of a verified topology change.
#[derive(Debug, Clone)]
pub struct ChangeReport {
    /// Role that was changed.
    pub role: Role,
    /// Requested member count.
    pub requested: u32,
    /// Time spent converging.
    pub elapsed: Duration,
    /// Poll ticks used.
    pub calls: u32,
    /// Members in the rebuilt topology.
    pub members: usize,
}

/// Drives a multi-step topology change and validates the outcome.
pub struct TopologyController<E> {
    ops: Arc<E>,
    config: Arc<EngineConfig>,
    phase: ChangePhase,
    topology: ClusterTopology,
}

impl<E: ClusterOps> TopologyController<E> {
    /// Create a controller over an executor and configuration.
    pub fn new(ops: Arc<E>, config: Arc<EngineConfig>) -> Self {
        Self {
            ops,
            config,
            phase: ChangePhase::Requested,
            topology: ClusterTopology::new(),
        }
    }

    /// Phase of the most recent change.
    pub fn phase(&self) -> ChangePhase {
        self.phase
    }

    /// The topology rebuilt by the last verified change.
    ///
    /// Only trustworthy immediately after a successful run; it is not kept
    /// live-synced with the cluster.
    pub fn topology(&self) -> &ClusterTopology {
        &self.topology
    }

    fn transition(&mut self, to: ChangePhase) {
        info!(from = %self.phase, to = %to, "topology change transition");
        self.phase = to;
    }

    /// Change a role's member count using the configured poll timing.
    pub async fn apply_change(&mut self, role: Role, target_count: u32) -> Result<ChangeReport> {
        let poll = self.config.poll;
        self.apply_change_with(role, target_count, poll).await
    }

    /// Change a role's member count with caller-supplied poll timing.
    #[instrument(skip(self, poll), fields(role = %role))]
    pub async fn apply_change_with(
        &mut self,
        role: Role,
        target_count: u32,
        poll: PollConfig,
    ) -> Result<ChangeReport> {
        poll.validate()?;
        self.phase = ChangePhase::Requested;
        match self.drive(role, target_count, poll).await {
            Ok(report) => {
                self.transition(ChangePhase::Verified);
                info!(
                    role = %role,
                    requested = target_count,
                    members = report.members,
                    calls = report.calls,
                    "topology change verified"
                );
                Ok(report)
            }
            Err(err) => {
                warn!(role = %role, requested = target_count, error = %err, "topology change failed");
                self.transition(ChangePhase::Failed);
                Err(err)
            }
        }
    }

    async fn drive(
        &mut self,
        role: Role,
        target_count: u32,
        poll: PollConfig,
    ) -> Result<ChangeReport> {
        // Requested -> Applying: one mutate call, no rollback on failure.
        self.transition(ChangePhase::Applying);
        self.ops
            .mutate(
                role.custom_resource_kind(),
                &self.config.namespace,
                &self.config.cluster_name,
                role.count_patch(target_count),
            )
            .await
            .map_err(|err| err.with_operation(format!("scale {} to {}", role, target_count)))?;

        // Applying -> Converging: poll the role's pods toward the count.
        self.transition(ChangePhase::Converging);
        let desired = DesiredState::selected(
            "Pod",
            self.config.namespace.as_str(),
            role.label_selector(),
            RUNNING_PHASE,
        )
        .with_expected_count(target_count as usize)
        .with_policy(self.config.policy);

        let sampler = Sampler::from_poll(&poll);
        let fetch = {
            let ops = Arc::clone(&self.ops);
            let kind = desired.resource_kind.clone();
            let namespace = desired.namespace.clone();
            let target = desired.target.clone();
            move || {
                let ops = Arc::clone(&ops);
                let kind = kind.clone();
                let namespace = namespace.clone();
                let target = target.clone();
                async move { ops.fetch(&kind, &namespace, &target).await }
            }
        };
        let outcome = sampler.wait_for_convergence(fetch, &desired).await?;
        if !outcome.converged {
            let last_observed = outcome
                .last_snapshot
                .as_ref()
                .map_or(0, |snapshot| snapshot.count_in_phase(RUNNING_PHASE));
            return Err(EngineError::Convergence {
                role,
                requested: target_count,
                selector: role.label_selector().to_string(),
                last_observed,
            });
        }

        // Converging -> Verified: secondary health re-check on a fresh
        // fetch, then rebuild the topology view with derived attributes.
        let fresh = self
            .ops
            .fetch(
                "Pod",
                &self.config.namespace,
                &Target::Selector(role.label_selector().to_string()),
            )
            .await?;
        let records = fresh.items();
        let running: Vec<_> = records
            .iter()
            .filter(|record| record.in_phase(RUNNING_PHASE))
            .collect();
        let healthy = match self.config.policy {
            CollectionPolicy::StrictUnanimous => {
                records.len() == target_count as usize && running.len() == target_count as usize
            }
            CollectionPolicy::CountOnly => running.len() == target_count as usize,
        };
        if !healthy {
            return Err(EngineError::Convergence {
                role,
                requested: target_count,
                selector: role.label_selector().to_string(),
                last_observed: running.len(),
            });
        }

        let members = running
            .into_iter()
            .map(TopologyMember::from_record)
            .collect::<Result<Vec<_>>>()?;
        let member_count = members.len();
        self.topology.replace(role, members);

        Ok(ChangeReport {
            role,
            requested: target_count,
            elapsed: outcome.elapsed,
            calls: outcome.calls,
            members: member_count,
        })
    }
}
