//! Connector and session abstraction over the directory protocol
//!
//! A [`Connector`] dials and binds; the [`Session`] it returns is used for a
//! single engine operation and released when dropped, on success and error
//! paths alike.

use crate::config::{DirectoryConfig, SearchScope};
use crate::entry::{Attribute, DESCRIPTION, RawEntry, UNIQUE_MEMBER};
use crate::error::Result;

/// A scoped search for group entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub base: String,
    pub scope: SearchScope,
    pub filter: String,
    pub attributes: Vec<String>,
}

impl SearchRequest {
    /// Build the search that locates `identity` under the configured base.
    ///
    /// A non-empty attribute list always asks for `description` and
    /// `uniqueMember`, since drift is computed from them. An empty list
    /// already returns every user attribute.
    pub fn for_identity(config: &DirectoryConfig, identity: &str) -> Self {
        let mut attributes = config.search_attributes.clone();
        if !attributes.is_empty() {
            for required in [DESCRIPTION, UNIQUE_MEMBER] {
                if !attributes.iter().any(|a| a.eq_ignore_ascii_case(required)) {
                    attributes.push(required.to_string());
                }
            }
        }

        Self {
            base: config.search_base.clone(),
            scope: config.search_scope,
            filter: config.filter_for(identity),
            attributes,
        }
    }
}

/// An authenticated connection to the directory.
///
/// Implementations close the underlying connection in `Drop`.
pub trait Session {
    /// Run a search and return every matching entry.
    fn search(&mut self, request: &SearchRequest) -> Result<Vec<RawEntry>>;

    /// Add a new entry.
    fn add(&mut self, dn: &str, attributes: &[Attribute]) -> Result<()>;

    /// Replace each listed attribute on an existing entry in one request.
    fn modify(&mut self, dn: &str, replacements: &[Attribute]) -> Result<()>;

    /// Delete an entry. Fails with `GroupNotFound` if the entry is gone.
    fn delete(&mut self, dn: &str) -> Result<()>;
}

/// Opens authenticated sessions against a directory.
pub trait Connector: Send + Sync {
    /// Dial the directory and bind with the configured credential.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryUnavailable` if the directory cannot be reached, the
    /// bind is rejected, or the connect timeout expires.
    fn connect(&self, config: &DirectoryConfig) -> Result<Box<dyn Session>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config(attributes: &[&str]) -> DirectoryConfig {
        DirectoryConfig {
            url: "ldap://localhost".to_string(),
            search_base: "ou=groups,dc=example,dc=org".to_string(),
            search_attributes: attributes.iter().map(|a| a.to_string()).collect(),
            ..DirectoryConfig::default()
        }
    }

    #[test]
    fn narrowed_attribute_list_keeps_compared_attributes() {
        let request = SearchRequest::for_identity(&config(&["cn"]), "team-x");
        assert_eq!(request.attributes, vec!["cn", "description", "uniqueMember"]);
    }

    #[test]
    fn attributes_already_requested_are_not_repeated() {
        let request =
            SearchRequest::for_identity(&config(&["uniquemember", "Description"]), "team-x");
        assert_eq!(request.attributes, vec!["uniquemember", "Description"]);
    }

    #[test]
    fn empty_attribute_list_requests_everything() {
        let request = SearchRequest::for_identity(&config(&[]), "team-x");
        assert!(request.attributes.is_empty());
        assert_eq!(request.filter, "(&(objectClass=groupOfUniqueNames)(cn=team-x))");
    }
}
