//! Mock infrastructure for simulating remote cluster state.
//!
//! `MockCluster` implements the engine's `ClusterOps` boundary over an
//! in-memory pod set, so convergence scenarios run without a live cluster.
//! Instead of scripting evaluator outcomes, the mock simulates only the
//! external state (pods appearing, being deleted, being replaced) and lets
//! the production sampler/evaluator/controller code drive everything else.
//!
//! The pod population follows a per-fetch schedule: on the k-th selector
//! fetch the pod set is synced to the k-th entry of the plan (the last
//! entry repeats), simulating an operator reconciling toward the desired
//! count. Deleted pods are replaced on the next sync, which is exactly the
//! churn-tolerance the failure-injection scenarios rely on.

use std::future::Future;
use std::sync::{Mutex, OnceLock};

use serde_json::{Value, json};

use ceph_converge::error::{EngineError, Result};
use ceph_converge::executor::ClusterOps;
use ceph_converge::snapshot::{ResourceRecord, Snapshot, Target};

/// Default mon routing port baked into simulated pods.
pub const MON_PORT: u16 = 6789;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Initialize tracing for tests (call once per process, idempotent).
pub fn init_tracing() {
    TRACING_INIT.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("info,ceph_converge=debug")
            .with_test_writer()
            .try_init();
    });
}

/// Build a pod record with the given name and status phase.
pub fn pod_record(name: &str, phase: &str) -> ResourceRecord {
    ResourceRecord::from_value(pod_json(name, phase, true)).expect("pod json should parse")
}

fn pod_json(name: &str, phase: &str, with_port: bool) -> Value {
    let container = if with_port {
        json!({ "name": "mon", "ports": [{ "containerPort": MON_PORT }] })
    } else {
        json!({ "name": "mon" })
    };
    json!({
        "metadata": { "name": name, "labels": { "app": "rook-ceph-mon" } },
        "status": { "phase": phase },
        "spec": { "containers": [container] },
    })
}

#[derive(Debug, Clone)]
struct SimPod {
    name: String,
    phase: String,
}

#[derive(Debug)]
struct State {
    pods: Vec<SimPod>,
    plan: Vec<usize>,
    selector_fetches: usize,
    next_ordinal: usize,
    scale_requests: Vec<(String, String, Value)>,
    deleted: Vec<String>,
    fail_mutate: bool,
    fail_delete: bool,
    omit_ports: bool,
    extra_pending: bool,
}

/// In-memory stand-in for the remote cluster.
#[derive(Debug)]
pub struct MockCluster {
    state: Mutex<State>,
}

impl MockCluster {
    /// Create a cluster whose mon pod count follows `plan`, one entry per
    /// selector fetch, with the last entry repeating.
    pub fn ramping(plan: Vec<usize>) -> Self {
        assert!(!plan.is_empty(), "plan must have at least one entry");
        Self {
            state: Mutex::new(State {
                pods: Vec::new(),
                plan,
                selector_fetches: 0,
                next_ordinal: 0,
                scale_requests: Vec::new(),
                deleted: Vec::new(),
                fail_mutate: false,
                fail_delete: false,
                omit_ports: false,
                extra_pending: false,
            }),
        }
    }

    /// Make every mutate call fail at the transport level.
    pub fn fail_mutations(&self) {
        self.state.lock().unwrap().fail_mutate = true;
    }

    /// Make every delete call fail at the transport level.
    pub fn fail_deletions(&self) {
        self.state.lock().unwrap().fail_delete = true;
    }

    /// Produce pods without container ports, for verification-failure tests.
    pub fn omit_ports(&self) {
        self.state.lock().unwrap().omit_ports = true;
    }

    /// Always list one extra Pending pod alongside the planned Running ones.
    pub fn with_extra_pending(&self) {
        self.state.lock().unwrap().extra_pending = true;
    }

    /// Scale requests recorded so far, as (kind, name, patch).
    pub fn scale_requests(&self) -> Vec<(String, String, Value)> {
        self.state.lock().unwrap().scale_requests.clone()
    }

    /// Names deleted so far.
    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    /// Selector fetches served so far.
    pub fn selector_fetches(&self) -> usize {
        self.state.lock().unwrap().selector_fetches
    }

    fn fetch_sync(&self, kind: &str, target: &Target) -> Result<Snapshot> {
        let mut state = self.state.lock().unwrap();
        match target {
            Target::Name(name) => {
                let pod = state.pods.iter().find(|p| &p.name == name).ok_or_else(|| {
                    EngineError::NotFound {
                        kind: kind.to_string(),
                        target: name.clone(),
                    }
                })?;
                let raw = pod_json(&pod.name, &pod.phase, !state.omit_ports);
                Ok(Snapshot::Resource(ResourceRecord::from_value(raw)?))
            }
            Target::Selector(_) => {
                let step = state.plan[state.selector_fetches.min(state.plan.len() - 1)];
                state.selector_fetches += 1;
                while state.pods.len() < step {
                    let name = format!("rook-ceph-mon-{}", state.next_ordinal);
                    state.next_ordinal += 1;
                    state.pods.push(SimPod {
                        name,
                        phase: "Running".to_string(),
                    });
                }
                while state.pods.len() > step {
                    state.pods.pop();
                }

                let with_port = !state.omit_ports;
                let mut items: Vec<ResourceRecord> = state
                    .pods
                    .iter()
                    .map(|p| ResourceRecord::from_value(pod_json(&p.name, &p.phase, with_port)))
                    .collect::<Result<_>>()?;
                if state.extra_pending {
                    items.push(ResourceRecord::from_value(pod_json(
                        "rook-ceph-mon-canary",
                        "Pending",
                        with_port,
                    ))?);
                }
                Ok(Snapshot::Collection(items))
            }
        }
    }

    fn mutate_sync(&self, kind: &str, name: &str, delta: Value) -> Result<Snapshot> {
        let mut state = self.state.lock().unwrap();
        if state.fail_mutate {
            return Err(EngineError::CommandFailed {
                operation: format!("patch {}/{}", kind, name),
                detail: "simulated transport failure".to_string(),
            });
        }
        state
            .scale_requests
            .push((kind.to_string(), name.to_string(), delta.clone()));
        let raw = json!({
            "metadata": { "name": name },
            "spec": delta.pointer("/spec").cloned().unwrap_or(Value::Null),
        });
        Ok(Snapshot::Resource(ResourceRecord::from_value(raw)?))
    }

    fn delete_sync(&self, kind: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_delete {
            return Err(EngineError::CommandFailed {
                operation: format!("delete {}/{}", kind, name),
                detail: "simulated transport failure".to_string(),
            });
        }
        let position = state.pods.iter().position(|p| p.name == name).ok_or_else(|| {
            EngineError::NotFound {
                kind: kind.to_string(),
                target: name.to_string(),
            }
        })?;
        state.pods.remove(position);
        state.deleted.push(name.to_string());
        Ok(())
    }
}

impl ClusterOps for MockCluster {
    fn fetch(
        &self,
        kind: &str,
        _namespace: &str,
        target: &Target,
    ) -> impl Future<Output = Result<Snapshot>> + Send {
        let result = self.fetch_sync(kind, target);
        async move { result }
    }

    fn mutate(
        &self,
        kind: &str,
        _namespace: &str,
        name: &str,
        delta: Value,
    ) -> impl Future<Output = Result<Snapshot>> + Send {
        let result = self.mutate_sync(kind, name, delta);
        async move { result }
    }

    fn delete(
        &self,
        kind: &str,
        _namespace: &str,
        name: &str,
    ) -> impl Future<Output = Result<()>> + Send {
        let result = self.delete_sync(kind, name);
        async move { result }
    }
}
