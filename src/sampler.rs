//! Deadline-bounded polling.
//!
//! [`Sampler`] repeatedly invokes a caller-supplied fetch at a fixed
//! interval and yields each observation until the deadline passes. The
//! fetch must be side-effect-free: it may be invoked an unbounded number of
//! times. Cancellation is cooperative and takes effect only at the
//! sleep-between-ticks boundary; an in-flight fetch is never interrupted.

use std::future::Future;
use std::pin::pin;
use std::time::Duration;

use futures::stream::{self, Stream, StreamExt};
use tokio::time::{Instant, sleep};
use tracing::{debug, trace};

use crate::config::PollConfig;
use crate::error::{EngineError, Result};
use crate::evaluator::{Observation, observe};
use crate::snapshot::{ConvergenceResult, DesiredState, Snapshot};

/// A deadline-bounded polling loop.
#[derive(Debug, Clone, Copy)]
pub struct Sampler {
    interval: Duration,
    timeout: Duration,
}

impl Sampler {
    /// Create a sampler with the given tick interval and deadline.
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Create a sampler from poll configuration.
    pub fn from_poll(poll: &PollConfig) -> Self {
        Self::new(poll.interval, poll.timeout)
    }

    /// Produce the finite sequence of observations.
    ///
    /// The first fetch happens immediately; subsequent fetches are spaced by
    /// the interval; the stream stops producing once elapsed time reaches
    /// the deadline, regardless of whether the consumer asks for more.
    ///
    /// Each call builds a fresh, single-pass stream. The stream is not
    /// restartable: a consumer that needs to poll again calls `stream` (or
    /// one of the wait helpers) again.
    ///
    /// An error from `fetch` is yielded as an item; whether it aborts the
    /// loop is the consumer's decision (the wait helpers below abort on
    /// everything except a mode-translated not-found).
    pub fn stream<F, Fut>(&self, fetch: F) -> impl Stream<Item = Result<Snapshot>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Snapshot>>,
    {
        let interval = self.interval;
        let timeout = self.timeout;
        let started = Instant::now();
        stream::unfold((fetch, 0u32), move |(mut fetch, ticks)| async move {
            if ticks > 0 {
                if started.elapsed() >= timeout {
                    return None;
                }
                sleep(interval).await;
                if started.elapsed() >= timeout {
                    return None;
                }
            }
            trace!(tick = ticks + 1, "polling");
            let item = fetch().await;
            Some((item, (fetch, ticks + 1)))
        })
        .fuse()
    }

    /// Drain the stream until `predicate` accepts a snapshot.
    ///
    /// Returns the first accepted snapshot, or [`EngineError::Timeout`] if
    /// the deadline is reached first. Fetch errors abort the wait.
    pub async fn wait_for<F, Fut, P>(&self, fetch: F, predicate: P) -> Result<Snapshot>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Snapshot>>,
        P: Fn(&Snapshot) -> bool,
    {
        let started = Instant::now();
        let mut calls = 0u32;
        let mut last = None;
        {
            let mut ticks = pin!(self.stream(fetch));
            while let Some(item) = ticks.next().await {
                let snapshot = item?;
                calls += 1;
                if predicate(&snapshot) {
                    return Ok(snapshot);
                }
                last = Some(snapshot);
            }
        }
        Err(EngineError::Timeout {
            subject: "snapshot".to_string(),
            condition: "predicate satisfied".to_string(),
            elapsed: started.elapsed(),
            calls,
            last: last.map(Box::new),
        })
    }

    /// Drive a [`DesiredState`] to convergence.
    ///
    /// Composes the stream with the condition evaluator, translating
    /// not-found fetches per the desired state's mode. Returns a
    /// [`ConvergenceResult`] whether or not the deadline was reached, so
    /// callers can attach their own diagnostics to a failed convergence;
    /// transport-level fetch errors propagate.
    pub async fn wait_for_convergence<F, Fut>(
        &self,
        fetch: F,
        state: &DesiredState,
    ) -> Result<ConvergenceResult>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Snapshot>>,
    {
        let started = Instant::now();
        let mut calls = 0u32;
        let mut last: Option<Snapshot> = None;
        {
            let mut ticks = pin!(self.stream(fetch));
            while let Some(item) = ticks.next().await {
                calls += 1;
                match observe(item, state)? {
                    Observation::Converged(snapshot) => {
                        debug!(
                            subject = %state.subject(),
                            condition = %state.condition(),
                            calls,
                            "converged"
                        );
                        return Ok(ConvergenceResult {
                            converged: true,
                            last_snapshot: snapshot.or(last),
                            elapsed: started.elapsed(),
                            calls,
                        });
                    }
                    Observation::Pending(snapshot) => {
                        if let Some(snapshot) = snapshot {
                            last = Some(snapshot);
                        }
                    }
                }
            }
        }
        debug!(
            subject = %state.subject(),
            condition = %state.condition(),
            calls,
            "deadline reached without convergence"
        );
        Ok(ConvergenceResult {
            converged: false,
            last_snapshot: last,
            elapsed: started.elapsed(),
            calls,
        })
    }

    /// Drive a [`DesiredState`] to convergence, raising on the deadline.
    ///
    /// Like [`Sampler::wait_for_convergence`], but a deadline miss becomes
    /// an [`EngineError::Timeout`] carrying the desired state's kind,
    /// name/selector, target condition, elapsed time, and last snapshot.
    pub async fn converge_or_timeout<F, Fut>(
        &self,
        fetch: F,
        state: &DesiredState,
    ) -> Result<ConvergenceResult>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Snapshot>>,
    {
        let outcome = self.wait_for_convergence(fetch, state).await?;
        if outcome.converged {
            Ok(outcome)
        } else {
            Err(EngineError::Timeout {
                subject: state.subject(),
                condition: state.condition(),
                elapsed: outcome.elapsed,
                calls: outcome.calls,
                last: outcome.last_snapshot.map(Box::new),
            })
        }
    }
}
