//! Observed group entries and the attributes they carry

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

pub const OBJECT_CLASS: &str = "objectClass";
pub const UNIQUE_MEMBER: &str = "uniqueMember";
pub const DESCRIPTION: &str = "description";

/// Object class given to every group this engine creates.
pub const GROUP_CLASS: &str = "groupOfUniqueNames";

/// An entry exactly as a directory search returned it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawEntry {
    pub dn: String,
    pub attributes: BTreeMap<String, Vec<String>>,
}

impl RawEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.attributes.insert(name.into(), values);
        self
    }

    /// Values of an attribute; attribute names are matched case-insensitively.
    pub fn values(&self, name: &str) -> &[String] {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }
}

/// A group as it currently exists in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryGroupEntry {
    pub distinguished_name: String,
    /// First `description` value, if any
    pub description: Option<String>,
    /// `uniqueMember` values in directory order
    pub members: Vec<String>,
    pub object_classes: Vec<String>,
}

impl DirectoryGroupEntry {
    /// Description with an absent attribute read as empty.
    pub fn description_or_empty(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }
}

impl From<RawEntry> for DirectoryGroupEntry {
    fn from(raw: RawEntry) -> Self {
        Self {
            description: raw.values(DESCRIPTION).first().cloned(),
            members: raw.values(UNIQUE_MEMBER).to_vec(),
            object_classes: raw.values(OBJECT_CLASS).to_vec(),
            distinguished_name: raw.dn,
        }
    }
}

/// One attribute and the full set of values it should hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub values: Vec<String>,
}

impl Attribute {
    pub fn new(name: &str, values: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            values,
        }
    }
}

/// Attributes written for a group, in the order create and modify send them.
///
/// Empty values are dropped: the directory rejects empty attribute values, and
/// replacing an attribute with no values removes it.
pub fn group_attributes(description: &str, members: &[String]) -> Vec<Attribute> {
    let description = if description.is_empty() {
        Vec::new()
    } else {
        vec![description.to_string()]
    };

    vec![
        Attribute::new(OBJECT_CLASS, vec![GROUP_CLASS.to_string()]),
        Attribute::new(DESCRIPTION, description),
        Attribute::new(UNIQUE_MEMBER, dedup_members(members)),
    ]
}

/// Drop members equal to an earlier one ignoring case, keeping the first spelling.
///
/// The directory matches DN values case-insensitively and refuses a value it
/// already holds.
fn dedup_members(members: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(members.len());
    members
        .iter()
        .filter(|member| seen.insert(member.to_lowercase()))
        .cloned()
        .collect()
}
