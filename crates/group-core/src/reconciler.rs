//! Per-object reconciliation loop
//!
//! One call to [`GroupReconciler::reconcile`] moves a desired group through
//! its lifecycle:
//!
//! ```text
//! Unseen --init--> Initialized --converge--> Converged
//!    \                  |                        |
//!     \                 +------ deletion --------+
//!      \                          |
//!       +---------------> Finalizing --release--> Released
//! ```
//!
//! The finalizer is always persisted before the directory is touched, so a
//! crash can never leave a directory group nobody is tracking. Every branch is
//! safe to run again for the same object.

use std::sync::Arc;

use group_directory::{DirectoryClient, GroupAction, GroupReconcile};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::condition::{Condition, ConditionStatus, ConditionType};
use crate::resource::{DesiredGroup, GroupSpec, LifecyclePhase};
use crate::store::DesiredStateStore;
use crate::Result;

/// Tuning for [`GroupReconciler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Refetch-and-retry attempts after a persist conflict
    pub max_conflict_retries: u32,
    /// Set `Configured=True` when convergence finds nothing to change
    pub mark_configured_when_settled: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            max_conflict_retries: 3,
            mark_configured_when_settled: false,
        }
    }
}

/// What one invocation achieved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub identity: String,
    pub phase: LifecyclePhase,
    /// True if the directory was written to
    pub mutation_occurred: bool,
    pub distinguished_name: Option<String>,
}

impl ReconcileOutcome {
    fn new(identity: &str, phase: LifecyclePhase) -> Self {
        Self {
            identity: identity.to_string(),
            phase,
            mutation_occurred: false,
            distinguished_name: None,
        }
    }
}

/// Directory work already done in this invocation, kept across conflict retries
/// so a refetch does not repeat it.
#[derive(Debug, Default)]
struct Progress {
    /// `Some(None)` when the group was already gone
    deleted: Option<Option<String>>,
    converged: Option<(GroupSpec, GroupReconcile)>,
}

/// Drives desired groups to their directory state
pub struct GroupReconciler {
    store: Arc<dyn DesiredStateStore>,
    directory: DirectoryClient,
    options: ReconcileOptions,
}

impl GroupReconciler {
    pub fn new(store: Arc<dyn DesiredStateStore>, directory: DirectoryClient) -> Self {
        Self::with_options(store, directory, ReconcileOptions::default())
    }

    pub fn with_options(
        store: Arc<dyn DesiredStateStore>,
        directory: DirectoryClient,
        options: ReconcileOptions,
    ) -> Self {
        Self {
            store,
            directory,
            options,
        }
    }

    pub fn store(&self) -> &Arc<dyn DesiredStateStore> {
        &self.store
    }

    pub fn directory(&self) -> &DirectoryClient {
        &self.directory
    }

    /// Reconcile the object named `identity`.
    ///
    /// A persist conflict refetches the object and re-runs the decision, up to
    /// `max_conflict_retries` times. Any other error is returned unchanged with
    /// the object's state left for the next invocation.
    pub fn reconcile(&self, identity: &str) -> Result<ReconcileOutcome> {
        let mut progress = Progress::default();
        let mut attempt = 0;

        loop {
            match self.reconcile_once(identity, &mut progress) {
                Ok(outcome) => {
                    debug!(group = identity, phase = %outcome.phase, mutated = outcome.mutation_occurred, "Reconciled");
                    return Ok(outcome);
                }
                Err(e) if e.is_conflict() && attempt < self.options.max_conflict_retries => {
                    attempt += 1;
                    debug!(group = identity, attempt, error = %e, "Persist conflict, refetching");
                }
                Err(e) => {
                    warn!(group = identity, error = %e, "Reconcile failed");
                    return Err(e);
                }
            }
        }
    }

    fn reconcile_once(&self, identity: &str, progress: &mut Progress) -> Result<ReconcileOutcome> {
        let Some(mut group) = self.store.get(identity)? else {
            debug!(group = identity, "Object gone, nothing to do");
            return Ok(ReconcileOutcome::new(identity, LifecyclePhase::Released));
        };

        if group.deletion_requested() {
            if !group.has_finalizer() {
                return Ok(ReconcileOutcome::new(identity, group.phase()));
            }
            return self.finalize(group, progress);
        }

        if !group.has_finalizer() {
            group = self.initialize(group)?;
        }

        self.converge(group, progress)
    }

    fn initialize(&self, mut group: DesiredGroup) -> Result<DesiredGroup> {
        group.add_finalizer();
        group.status.conditions.set(
            Condition::new(ConditionType::Initialized, ConditionStatus::True)
                .with_reason("FinalizerAdded"),
        );
        group.status.conditions.set(
            Condition::new(ConditionType::Configured, ConditionStatus::False)
                .with_reason("Pending")
                .with_message("Directory group not yet converged"),
        );

        let group = self.store.update(&group)?;
        info!(group = %group.identity(), "Finalizer recorded");
        Ok(group)
    }

    fn finalize(&self, mut group: DesiredGroup, progress: &mut Progress) -> Result<ReconcileOutcome> {
        let identity = group.identity().to_string();

        let deleted = match &progress.deleted {
            Some(deleted) => deleted.clone(),
            None => {
                let deleted = match self.directory.delete_group(&identity) {
                    Ok(dn) => Some(dn),
                    Err(e) if e.is_not_found() => {
                        debug!(group = %identity, "Directory group already absent");
                        None
                    }
                    Err(e) => return Err(e.into()),
                };
                progress.deleted = Some(deleted.clone());
                deleted
            }
        };

        group.remove_finalizer();
        let released = self.store.update(&group)?;
        info!(group = %identity, "Finalizer removed");

        Ok(ReconcileOutcome {
            identity,
            phase: released.phase(),
            mutation_occurred: deleted.is_some(),
            distinguished_name: deleted,
        })
    }

    fn converge(&self, mut group: DesiredGroup, progress: &mut Progress) -> Result<ReconcileOutcome> {
        let identity = group.identity().to_string();

        let result = match &progress.converged {
            Some((spec, result)) if *spec == group.spec => result.clone(),
            _ => {
                let result = self.directory.reconcile_group(
                    &identity,
                    &group.spec.comment,
                    &group.spec.members,
                )?;
                progress.converged = Some((group.spec.clone(), result.clone()));
                result
            }
        };

        if result.mutation_occurred() {
            let reason = match result.action {
                GroupAction::Created => "Created",
                _ => "DriftCorrected",
            };
            group.status.distinguished_name = Some(result.distinguished_name.clone());
            // Settles to True on a later pass that finds no drift
            group.status.conditions.set(
                Condition::new(ConditionType::Configured, ConditionStatus::False)
                    .with_reason(reason)
                    .with_message(format!("Wrote {}", result.distinguished_name)),
            );
            self.store.update(&group)?;
        } else if self.options.mark_configured_when_settled {
            let dn_changed =
                group.status.distinguished_name.as_deref() != Some(result.distinguished_name.as_str());
            group.status.distinguished_name = Some(result.distinguished_name.clone());
            let changed = group.status.conditions.set(
                Condition::new(ConditionType::Configured, ConditionStatus::True)
                    .with_reason("InSync"),
            );
            if changed || dn_changed {
                self.store.update(&group)?;
            }
        }

        Ok(ReconcileOutcome {
            identity,
            phase: LifecyclePhase::Converged,
            mutation_occurred: result.mutation_occurred(),
            distinguished_name: Some(result.distinguished_name),
        })
    }
}

impl std::fmt::Debug for GroupReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupReconciler")
            .field("directory", &self.directory)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
