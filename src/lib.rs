//! ceph-converge library crate
//!
//! The convergence/polling engine for a Ceph/Rook storage cluster e2e test
//! framework: a deadline-bounded [`Sampler`], a pure condition
//! [`evaluator`], a [`TopologyController`] that drives and verifies
//! multi-step topology changes, and a [`FailureInjector`] that disrupts
//! cluster state while other work converges.
//!
//! All remote access goes through the [`executor::ClusterOps`] boundary;
//! the engine is agnostic to whether an API client or a CLI subprocess
//! implements it.

pub mod config;
pub mod controller;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod injector;
pub mod sampler;
pub mod snapshot;
pub mod topology;

pub use config::{CollectionPolicy, EngineConfig, ExecutorConfig, PollConfig};
pub use controller::{ChangePhase, ChangeReport, TopologyController};
pub use error::{EngineError, Result};
pub use evaluator::{Observation, converged, observe};
pub use executor::{ApiExecutor, CliExecutor, ClusterOps, Executor};
pub use injector::{FailureInjector, InjectionReport};
pub use sampler::Sampler;
pub use snapshot::{ConvergenceResult, DesiredState, ResourceRecord, Snapshot, Target};
pub use topology::{ClusterTopology, Role, TopologyMember};
