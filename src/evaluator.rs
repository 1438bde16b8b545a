//! Convergence condition evaluation.
//!
//! [`converged`] is a pure function from one snapshot and one desired state
//! to a boolean: no I/O, deterministic for identical inputs. [`observe`]
//! wraps it with the engine's only error-to-outcome translation: a
//! not-found fetch is success in deletion mode and a pending retry
//! everywhere else.

use crate::config::CollectionPolicy;
use crate::error::Result;
use crate::snapshot::{DesiredState, Snapshot, Target};

/// What one poll tick tells us.
#[derive(Debug)]
pub enum Observation {
    /// The desired state holds. Carries the snapshot that satisfied it,
    /// absent when convergence came from a not-found fetch.
    Converged(Option<Snapshot>),
    /// Not there yet; the sampler keeps polling.
    Pending(Option<Snapshot>),
}

/// Decide whether one snapshot satisfies the desired state.
///
/// Mode is selected by the populated fields of `state`:
/// - deletion mode (`to_delete`): converged iff the snapshot is empty;
/// - named mode (`Target::Name`): converged iff the status phase equals the
///   target condition;
/// - collection mode (`Target::Selector`): counts the items in the target
///   condition and applies the configured [`CollectionPolicy`].
pub fn converged(snapshot: &Snapshot, state: &DesiredState) -> bool {
    if state.to_delete {
        return snapshot.is_empty();
    }

    match (&state.target, snapshot) {
        (Target::Name(_), Snapshot::Resource(record)) => record.in_phase(&state.target_condition),
        (Target::Selector(_), Snapshot::Collection(items)) => {
            let listed = items.len();
            let matching = items
                .iter()
                .filter(|r| r.in_phase(&state.target_condition))
                .count();
            match state.expected_count {
                Some(expected) => match state.policy {
                    CollectionPolicy::StrictUnanimous => {
                        matching == expected && matching == listed
                    }
                    CollectionPolicy::CountOnly => matching == expected,
                },
                None => matching == listed,
            }
        }
        // Shape mismatch: the caller fetched in a different mode than the
        // desired state describes. Never converged.
        _ => false,
    }
}

/// Fold one fetch outcome into an [`Observation`].
///
/// This is the single place a [`EngineError::NotFound`] becomes success
/// (deletion mode) or a retryable pending tick (named/collection modes).
/// Every other error aborts the loop.
pub fn observe(
    fetched: Result<Snapshot>,
    state: &DesiredState,
) -> Result<Observation> {
    match fetched {
        Ok(snapshot) => {
            if converged(&snapshot, state) {
                Ok(Observation::Converged(Some(snapshot)))
            } else {
                Ok(Observation::Pending(Some(snapshot)))
            }
        }
        Err(err) if err.is_not_found() => {
            if state.to_delete {
                Ok(Observation::Converged(None))
            } else {
                Ok(Observation::Pending(None))
            }
        }
        Err(err) => Err(err),
    }
}
