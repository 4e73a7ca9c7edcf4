//! Polling dispatcher
//!
//! Lists the store on every tick and reconciles each identity that is due.
//! Failures are scoped to their object: they are logged, counted and
//! requeued with exponential backoff while the other objects carry on.

use std::collections::BTreeMap;
use std::thread;
use std::time::{Duration, Instant};

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use group_directory::RetryClass;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::reconciler::GroupReconciler;
use crate::{Error, Result};

/// Requeue timing for failed objects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Minimum delay after failures that need an operator to fix
    pub slow_retry: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(300),
            slow_retry: Duration::from_secs(600),
        }
    }
}

/// Summary of one pass over the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Objects reconciled without error
    pub reconciled: usize,
    /// Of those, how many wrote to the directory
    pub mutated: usize,
    /// `(identity, error)` for every failed object
    pub failed: Vec<(String, String)>,
    /// Objects skipped because their retry is not due yet
    pub deferred: usize,
}

impl TickReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

struct Requeue {
    backoff: ExponentialBackoff,
    not_before: Instant,
    failures: u32,
}

impl std::fmt::Debug for Requeue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Requeue")
            .field("not_before", &self.not_before)
            .field("failures", &self.failures)
            .finish_non_exhaustive()
    }
}

/// Reconciles every stored object, requeueing failures
#[derive(Debug)]
pub struct Controller {
    reconciler: GroupReconciler,
    options: ControllerOptions,
    requeue: BTreeMap<String, Requeue>,
}

impl Controller {
    pub fn new(reconciler: GroupReconciler, options: ControllerOptions) -> Self {
        Self {
            reconciler,
            options,
            requeue: BTreeMap::new(),
        }
    }

    pub fn reconciler(&self) -> &GroupReconciler {
        &self.reconciler
    }

    /// Run one pass now.
    pub fn tick(&mut self) -> Result<TickReport> {
        self.tick_at(Instant::now())
    }

    /// Run one pass as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Only fails if the store cannot be listed; per-object failures are
    /// reported in [`TickReport::failed`].
    pub fn tick_at(&mut self, now: Instant) -> Result<TickReport> {
        let identities = self.reconciler.store().list()?;
        self.requeue
            .retain(|identity, _| identities.contains(identity));

        let mut report = TickReport::default();
        for identity in &identities {
            if let Some(entry) = self.requeue.get(identity)
                && entry.not_before > now
            {
                report.deferred += 1;
                continue;
            }

            match self.reconciler.reconcile(identity) {
                Ok(outcome) => {
                    self.requeue.remove(identity);
                    report.reconciled += 1;
                    if outcome.mutation_occurred {
                        report.mutated += 1;
                    }
                }
                Err(e) => {
                    self.schedule_retry(identity, &e, now);
                    report.failed.push((identity.clone(), e.to_string()));
                }
            }
        }

        if report.mutated > 0 || !report.failed.is_empty() {
            info!(
                reconciled = report.reconciled,
                mutated = report.mutated,
                failed = report.failed.len(),
                deferred = report.deferred,
                "Tick complete"
            );
        } else {
            debug!(reconciled = report.reconciled, deferred = report.deferred, "Tick complete");
        }
        Ok(report)
    }

    fn schedule_retry(&mut self, identity: &str, err: &Error, now: Instant) {
        let options = self.options;
        let entry = self
            .requeue
            .entry(identity.to_string())
            .or_insert_with(|| Requeue {
                backoff: ExponentialBackoffBuilder::new()
                    .with_initial_interval(options.initial_backoff)
                    .with_max_interval(options.max_backoff)
                    .with_max_elapsed_time(None)
                    .build(),
                not_before: now,
                failures: 0,
            });

        entry.failures += 1;
        let next = entry.backoff.next_backoff().unwrap_or(options.max_backoff);
        let delay = match err.retry_class() {
            RetryClass::Immediate => options.initial_backoff,
            RetryClass::Backoff => next,
            RetryClass::Slow => next.max(options.slow_retry),
        };
        entry.not_before = now + delay;

        warn!(
            group = identity,
            failures = entry.failures,
            retry_in = ?delay,
            "Requeued after failure"
        );
    }

    /// Earliest time a requeued object becomes due
    pub fn next_due(&self) -> Option<Instant> {
        self.requeue.values().map(|r| r.not_before).min()
    }

    /// Number of objects waiting on a retry
    pub fn pending_retries(&self) -> usize {
        self.requeue.len()
    }

    /// Tick every `poll_interval`, waking early for due retries. Stops after
    /// `max_ticks` passes if given.
    pub fn run(&mut self, poll_interval: Duration, max_ticks: Option<u64>) {
        let mut ticks = 0;
        loop {
            if let Err(e) = self.tick() {
                error!(error = %e, "Failed to list desired groups");
            }
            ticks += 1;
            if max_ticks.is_some_and(|max| ticks >= max) {
                break;
            }

            let now = Instant::now();
            let wait = match self.next_due() {
                Some(due) => due.saturating_duration_since(now).min(poll_interval),
                None => poll_interval,
            };
            thread::sleep(wait);
        }
    }
}
