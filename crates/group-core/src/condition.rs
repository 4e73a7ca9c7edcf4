//! Status conditions exposed on desired groups
//!
//! Conditions form an ordered list keyed by type. Setting a condition replaces
//! the entry of the same type in place or appends a new one, so the list is
//! never reordered and never holds two entries of one type.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kinds of condition the reconciler reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionType {
    /// The finalizer is in place and the object is tracked
    Initialized,
    /// The directory group is settled
    Configured,
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionType::Initialized => write!(f, "Initialized"),
            ConditionType::Configured => write!(f, "Configured"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionStatus::True => write!(f, "True"),
            ConditionStatus::False => write!(f, "False"),
            ConditionStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A typed, timestamped status flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    pub status: ConditionStatus,
    /// When `status` last changed value
    pub last_transition_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Condition {
    pub fn new(condition_type: ConditionType, status: ConditionStatus) -> Self {
        Self {
            condition_type,
            status,
            last_transition_time: Utc::now(),
            reason: None,
            message: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Ordered list of conditions, at most one per type
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conditions(Vec<Condition>);

impl Conditions {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Set a condition, replacing the entry of the same type in place or
    /// appending it.
    ///
    /// The stored transition time only moves when the status value changes.
    /// Returns true if anything about the stored condition changed.
    pub fn set(&mut self, condition: Condition) -> bool {
        let Some(existing) = self
            .0
            .iter_mut()
            .find(|c| c.condition_type == condition.condition_type)
        else {
            self.0.push(condition);
            return true;
        };

        let mut changed = false;
        if existing.status != condition.status {
            existing.status = condition.status;
            existing.last_transition_time = condition.last_transition_time;
            changed = true;
        }
        if existing.reason != condition.reason {
            existing.reason = condition.reason;
            changed = true;
        }
        if existing.message != condition.message {
            existing.message = condition.message;
            changed = true;
        }
        changed
    }

    pub fn get(&self, condition_type: ConditionType) -> Option<&Condition> {
        self.0.iter().find(|c| c.condition_type == condition_type)
    }

    /// Status of a condition, `Unknown` if it has never been set
    pub fn status(&self, condition_type: ConditionType) -> ConditionStatus {
        self.get(condition_type)
            .map(|c| c.status)
            .unwrap_or(ConditionStatus::Unknown)
    }

    pub fn is_true(&self, condition_type: ConditionType) -> bool {
        self.status(condition_type) == ConditionStatus::True
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    #[test]
    fn set_appends_new_types_in_order() {
        let mut conditions = Conditions::new();
        assert!(conditions.set(Condition::new(ConditionType::Initialized, ConditionStatus::True)));
        assert!(conditions.set(Condition::new(ConditionType::Configured, ConditionStatus::False)));

        let types: Vec<_> = conditions.iter().map(|c| c.condition_type).collect();
        assert_eq!(types, vec![ConditionType::Initialized, ConditionType::Configured]);
    }

    #[test]
    fn set_replaces_in_place_without_duplicates() {
        let mut conditions = Conditions::new();
        conditions.set(Condition::new(ConditionType::Configured, ConditionStatus::False));
        conditions.set(Condition::new(ConditionType::Initialized, ConditionStatus::True));
        conditions.set(Condition::new(ConditionType::Configured, ConditionStatus::True));

        assert_eq!(conditions.len(), 2);
        let first = conditions.iter().next().unwrap();
        assert_eq!(first.condition_type, ConditionType::Configured);
        assert_eq!(first.status, ConditionStatus::True);
    }

    #[test]
    fn transition_time_only_moves_on_status_change() {
        let mut conditions = Conditions::new();
        let mut original = Condition::new(ConditionType::Configured, ConditionStatus::False);
        original.last_transition_time -= Duration::hours(1);
        let stamped = original.last_transition_time;
        conditions.set(original);

        let changed = conditions.set(Condition::new(ConditionType::Configured, ConditionStatus::False));
        assert!(!changed);
        assert_eq!(
            conditions.get(ConditionType::Configured).unwrap().last_transition_time,
            stamped
        );

        conditions.set(Condition::new(ConditionType::Configured, ConditionStatus::True));
        assert!(conditions.get(ConditionType::Configured).unwrap().last_transition_time > stamped);
    }

    #[test]
    fn unset_condition_is_unknown() {
        let conditions = Conditions::new();
        assert_eq!(conditions.status(ConditionType::Configured), ConditionStatus::Unknown);
        assert!(!conditions.is_true(ConditionType::Initialized));
    }

    #[test]
    fn reason_change_counts_as_change() {
        let mut conditions = Conditions::new();
        conditions.set(Condition::new(ConditionType::Configured, ConditionStatus::False).with_reason("Created"));
        assert!(conditions.set(
            Condition::new(ConditionType::Configured, ConditionStatus::False).with_reason("DriftCorrected")
        ));
    }
}
