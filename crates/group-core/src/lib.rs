//! Reconciliation loop for directory groups
//!
//! This crate turns declarative [`DesiredGroup`] objects into directory state
//! through the `group-directory` sync engine:
//!
//! - **Resources**: desired groups with finalizers and status conditions
//! - **Stores**: optimistic-concurrency stores in memory or on disk
//! - **Reconciler**: the finalizer-driven lifecycle for a single object
//! - **Controller**: a polling dispatcher with per-object backoff
//!
//! # Architecture
//!
//! ```text
//!              groupctl
//!                 |
//!   Controller -> GroupReconciler
//!                 |            |
//!      DesiredStateStore   DirectoryClient (group-directory)
//!                 |
//!   MemoryStore / FileStore -- SchemeRegistry
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use group_core::{GroupReconciler, MemoryStore};
//!
//! let store = Arc::new(MemoryStore::new());
//! let reconciler = GroupReconciler::new(store, directory_client);
//! let outcome = reconciler.reconcile("team-x")?;
//! ```

pub mod condition;
pub mod config;
pub mod controller;
pub mod error;
pub mod reconciler;
pub mod resource;
pub mod scheme;
pub mod store;

pub use condition::{Condition, ConditionStatus, ConditionType, Conditions};
pub use config::{ControllerConfig, OperatorConfig};
pub use controller::{Controller, ControllerOptions, TickReport};
pub use error::{Error, Result};
pub use reconciler::{GroupReconciler, ReconcileOptions, ReconcileOutcome};
pub use resource::{
    API_VERSION, DesiredGroup, GROUP_FINALIZER, GROUP_KIND, GroupSpec, GroupStatus,
    LifecyclePhase, ObjectMeta, TypeMeta,
};
pub use scheme::SchemeRegistry;
pub use store::{DesiredStateStore, FileStore, MemoryStore};

#[cfg(test)]
mod tests {
    use super::*;
    use group_directory::RetryClass;

    #[test]
    fn conflict_retries_immediately() {
        let err = Error::PersistConflict {
            identity: "team-x".to_string(),
            expected: 1,
            found: 2,
        };
        assert!(err.is_conflict());
        assert_eq!(err.retry_class(), RetryClass::Immediate);
        assert!(err.to_string().contains("team-x"));
    }

    #[test]
    fn directory_errors_keep_their_class() {
        let err: Error = group_directory::Error::AmbiguousResult {
            identity: "team-x".to_string(),
            count: 2,
        }
        .into();
        assert_eq!(err.retry_class(), RetryClass::Slow);
        assert!(!err.is_conflict());
    }
}
