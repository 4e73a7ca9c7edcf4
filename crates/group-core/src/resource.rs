//! Desired-state group objects
//!
//! A [`DesiredGroup`] carries the declarative spec owned by its author and the
//! lifecycle markers and status owned by the reconciler.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::condition::{ConditionType, Conditions};

pub const API_VERSION: &str = "directory.group-operator.io/v1";
pub const GROUP_KIND: &str = "Group";

/// Finalizer that blocks removal until the directory group is deleted.
pub const GROUP_FINALIZER: &str = "directory.group-operator.io/group-finalizer";

/// API version and kind identifying a resource schema
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeMeta {
    pub api_version: String,
    pub kind: String,
}

impl TypeMeta {
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
        }
    }

    /// Type of [`DesiredGroup`]
    pub fn group() -> Self {
        Self::new(API_VERSION, GROUP_KIND)
    }
}

impl fmt::Display for TypeMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.api_version, self.kind)
    }
}

/// Store-managed metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Group identity, also the name of the directory group
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<Uuid>,

    /// Bumped by the store on every successful write
    #[serde(default)]
    pub resource_version: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,

    /// Set once deletion has been requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub finalizers: Vec<String>,
}

impl ObjectMeta {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uid: None,
            resource_version: 0,
            creation_timestamp: None,
            deletion_timestamp: None,
            finalizers: Vec::new(),
        }
    }
}

/// What the directory group should look like
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupSpec {
    /// Written to the group's `description`
    #[serde(default)]
    pub comment: String,

    /// Member DNs written to `uniqueMember`
    #[serde(default)]
    pub members: Vec<String>,
}

/// What the reconciler last observed and decided
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distinguished_name: Option<String>,

    #[serde(default)]
    pub conditions: Conditions,
}

/// Where an object stands in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecyclePhase {
    /// No finalizer yet; nothing has been done
    Unseen,
    /// Finalizer recorded; the directory group may not exist yet
    Initialized,
    /// The directory group has been converged at least once
    Converged,
    /// Deletion requested; the directory group still has to go
    Finalizing,
    /// Cleanup done; the store may drop the object
    Released,
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecyclePhase::Unseen => "Unseen",
            LifecyclePhase::Initialized => "Initialized",
            LifecyclePhase::Converged => "Converged",
            LifecyclePhase::Finalizing => "Finalizing",
            LifecyclePhase::Released => "Released",
        };
        write!(f, "{}", name)
    }
}

/// Declarative description of one directory group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredGroup {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: GroupSpec,
    #[serde(default)]
    pub status: GroupStatus,
}

impl DesiredGroup {
    pub fn new(name: impl Into<String>, comment: impl Into<String>, members: Vec<String>) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: GROUP_KIND.to_string(),
            metadata: ObjectMeta::named(name),
            spec: GroupSpec {
                comment: comment.into(),
                members,
            },
            status: GroupStatus::default(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.metadata.name
    }

    pub fn type_meta(&self) -> TypeMeta {
        TypeMeta::new(&self.api_version, &self.kind)
    }

    pub fn deletion_requested(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    pub fn has_finalizer(&self) -> bool {
        self.metadata.finalizers.iter().any(|f| f == GROUP_FINALIZER)
    }

    /// Returns true if the finalizer was not already present.
    pub fn add_finalizer(&mut self) -> bool {
        if self.has_finalizer() {
            return false;
        }
        self.metadata.finalizers.push(GROUP_FINALIZER.to_string());
        true
    }

    /// Returns true if the finalizer was present.
    pub fn remove_finalizer(&mut self) -> bool {
        let before = self.metadata.finalizers.len();
        self.metadata.finalizers.retain(|f| f != GROUP_FINALIZER);
        before != self.metadata.finalizers.len()
    }

    /// True once deletion is requested and no finalizer holds the object.
    pub fn is_releasable(&self) -> bool {
        self.deletion_requested() && self.metadata.finalizers.is_empty()
    }

    /// Lifecycle phase implied by the markers and status.
    pub fn phase(&self) -> LifecyclePhase {
        match (self.deletion_requested(), self.has_finalizer()) {
            (true, true) => LifecyclePhase::Finalizing,
            (true, false) => LifecyclePhase::Released,
            (false, false) => LifecyclePhase::Unseen,
            (false, true)
                if self.status.distinguished_name.is_some()
                    || self.status.conditions.is_true(ConditionType::Configured) =>
            {
                LifecyclePhase::Converged
            }
            (false, true) => LifecyclePhase::Initialized,
        }
    }
}
