//! Registry of resource kinds the operator can decode and encode
//!
//! Built once at startup and shared with the stores that read documents, so
//! there is no process-wide registration.

use std::collections::BTreeSet;

use serde::Deserialize;

use crate::resource::{DesiredGroup, TypeMeta};
use crate::{Error, Result};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Header {
    api_version: String,
    kind: String,
}

/// Known `(apiVersion, kind)` pairs
#[derive(Debug, Clone, Default)]
pub struct SchemeRegistry {
    kinds: BTreeSet<TypeMeta>,
}

impl SchemeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that knows the group kind
    pub fn with_groups() -> Self {
        let mut registry = Self::new();
        registry.register(TypeMeta::group());
        registry
    }

    /// Register a kind. Returns false if it was already known.
    pub fn register(&mut self, type_meta: TypeMeta) -> bool {
        self.kinds.insert(type_meta)
    }

    pub fn recognizes(&self, type_meta: &TypeMeta) -> bool {
        self.kinds.contains(type_meta)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &TypeMeta> {
        self.kinds.iter()
    }

    /// Decode a TOML group document after checking its kind is registered.
    pub fn decode_group(&self, text: &str) -> Result<DesiredGroup> {
        let header: Header = toml::from_str(text)?;
        self.require(&TypeMeta::new(header.api_version, header.kind))?;
        Ok(toml::from_str(text)?)
    }

    /// Encode a group as a TOML document.
    pub fn encode_group(&self, group: &DesiredGroup) -> Result<String> {
        self.require(&group.type_meta())?;
        Ok(toml::to_string_pretty(group)?)
    }

    fn require(&self, type_meta: &TypeMeta) -> Result<()> {
        if self.recognizes(type_meta) {
            Ok(())
        } else {
            Err(Error::UnknownKind {
                kind: type_meta.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{Condition, ConditionStatus, ConditionType};
    use pretty_assertions::assert_eq;

    #[test]
    fn group_documents_survive_encode_and_decode() {
        let registry = SchemeRegistry::with_groups();
        let mut group = DesiredGroup::new("team-x", "Team X", vec!["uid=alice".to_string()]);
        group.add_finalizer();
        group.metadata.resource_version = 4;
        group
            .status
            .conditions
            .set(Condition::new(ConditionType::Initialized, ConditionStatus::True));

        let text = registry.encode_group(&group).unwrap();
        assert!(text.contains("apiVersion"));
        let decoded = registry.decode_group(&text).unwrap();
        assert_eq!(decoded, group);
    }

    #[test]
    fn unregistered_kinds_are_rejected() {
        let registry = SchemeRegistry::new();
        let group = DesiredGroup::new("team-x", "", Vec::new());
        assert!(matches!(
            registry.encode_group(&group),
            Err(Error::UnknownKind { .. })
        ));

        let text = r#"
apiVersion = "example.org/v1"
kind = "Project"

[metadata]
name = "p"
"#;
        let err = SchemeRegistry::with_groups().decode_group(text).unwrap_err();
        assert!(err.to_string().contains("example.org/v1/Project"));
    }

    #[test]
    fn minimal_document_decodes_with_defaults() {
        let text = r#"
apiVersion = "directory.group-operator.io/v1"
kind = "Group"

[metadata]
name = "team-x"

[spec]
comment = "Team X"
members = ["uid=alice,ou=people,dc=example,dc=org"]
"#;
        let group = SchemeRegistry::with_groups().decode_group(text).unwrap();
        assert_eq!(group.identity(), "team-x");
        assert_eq!(group.metadata.resource_version, 0);
        assert!(group.status.conditions.is_empty());
    }
}
