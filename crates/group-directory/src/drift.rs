//! Drift detection between an observed group entry and the desired group
//!
//! Members are compared as sets of lowercased values; the description is
//! compared verbatim, with an absent attribute read as empty.

use serde::{Deserialize, Serialize};

use crate::entry::DirectoryGroupEntry;

/// Overall state of a group relative to its desired definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriftStatus {
    /// The entry matches the desired description and members
    InSync,
    /// No entry exists for the group
    Missing,
    /// The entry exists but differs
    Drifted,
}

/// Report describing how an observed group differs from its desired state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDrift {
    pub status: DriftStatus,
    /// DN of the observed entry, if one exists
    pub distinguished_name: Option<String>,
    /// `(observed, desired)` when the descriptions differ
    pub description: Option<(String, String)>,
    /// Normalized members the directory is missing
    pub members_to_add: Vec<String>,
    /// Normalized members the directory has but should not
    pub members_to_remove: Vec<String>,
}

impl GroupDrift {
    /// Compare an observed entry (or its absence) with the desired state.
    pub fn compute(
        observed: Option<&DirectoryGroupEntry>,
        description: &str,
        members: &[String],
    ) -> Self {
        let desired = normalize_members(members);

        let Some(entry) = observed else {
            return Self {
                status: DriftStatus::Missing,
                distinguished_name: None,
                description: None,
                members_to_add: desired,
                members_to_remove: Vec::new(),
            };
        };

        let actual = normalize_members(&entry.members);
        let members_to_add: Vec<String> = desired
            .iter()
            .filter(|m| actual.binary_search(*m).is_err())
            .cloned()
            .collect();
        let members_to_remove: Vec<String> = actual
            .iter()
            .filter(|m| desired.binary_search(*m).is_err())
            .cloned()
            .collect();

        let description = (entry.description_or_empty() != description)
            .then(|| (entry.description_or_empty().to_string(), description.to_string()));

        let status = if description.is_none()
            && members_to_add.is_empty()
            && members_to_remove.is_empty()
        {
            DriftStatus::InSync
        } else {
            DriftStatus::Drifted
        };

        Self {
            status,
            distinguished_name: Some(entry.distinguished_name.clone()),
            description,
            members_to_add,
            members_to_remove,
        }
    }

    pub fn is_in_sync(&self) -> bool {
        self.status == DriftStatus::InSync
    }

    /// Human-readable lines describing each difference.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if self.status == DriftStatus::Missing {
            lines.push("group entry does not exist".to_string());
        }
        if let Some((observed, desired)) = &self.description {
            lines.push(format!(
                "description is '{}', expected '{}'",
                observed, desired
            ));
        }
        for member in &self.members_to_add {
            lines.push(format!("member missing: {}", member));
        }
        for member in &self.members_to_remove {
            lines.push(format!("unexpected member: {}", member));
        }
        lines
    }
}

/// Lowercase, sort and deduplicate a member list.
pub fn normalize_members(members: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = members.iter().map(|m| m.to_lowercase()).collect();
    normalized.sort();
    normalized.dedup();
    normalized
}
