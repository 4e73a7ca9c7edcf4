//! Directory client converging group entries
//!
//! Every public operation opens its own session through the [`Connector`] and
//! drops it before returning. Nothing observed in the directory is cached
//! between calls.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::DirectoryConfig;
use crate::drift::{DriftStatus, GroupDrift};
use crate::entry::{DirectoryGroupEntry, group_attributes};
use crate::error::{Error, Result};
use crate::ldap::LdapConnector;
use crate::session::{Connector, SearchRequest, Session};

/// What [`DirectoryClient::reconcile_group`] had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupAction {
    Created,
    Modified,
    Unchanged,
}

/// Result of converging one group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupReconcile {
    pub distinguished_name: String,
    pub action: GroupAction,
}

impl GroupReconcile {
    /// True if a create or modify request was sent
    pub fn mutation_occurred(&self) -> bool {
        self.action != GroupAction::Unchanged
    }
}

/// Stateless client for group entries in one directory
#[derive(Clone)]
pub struct DirectoryClient {
    config: DirectoryConfig,
    connector: Arc<dyn Connector>,
}

impl std::fmt::Debug for DirectoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DirectoryClient {
    /// Create a client using the given connector
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the configuration is rejected by
    /// [`DirectoryConfig::validate`].
    pub fn new(config: DirectoryConfig, connector: Arc<dyn Connector>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, connector })
    }

    /// Create a client talking LDAP to `config.url`
    pub fn ldap(config: DirectoryConfig) -> Result<Self> {
        Self::new(config, Arc::new(LdapConnector))
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    fn session(&self) -> Result<Box<dyn Session>> {
        self.connector.connect(&self.config)
    }

    fn find(&self, session: &mut dyn Session, identity: &str) -> Result<Option<DirectoryGroupEntry>> {
        let request = SearchRequest::for_identity(&self.config, identity);
        let mut entries = session.search(&request)?;

        match entries.len() {
            0 => Ok(None),
            1 => Ok(entries.pop().map(DirectoryGroupEntry::from)),
            count => Err(Error::AmbiguousResult {
                identity: identity.to_string(),
                count,
            }),
        }
    }

    /// Look up the group for `identity`; `None` means it does not exist.
    ///
    /// # Errors
    ///
    /// - [`Error::DirectoryUnavailable`] if the directory cannot be reached
    /// - [`Error::SearchRejected`] if the directory refuses the search itself
    /// - [`Error::AmbiguousResult`] if the filter matches more than one entry
    pub fn group_exists(&self, identity: &str) -> Result<Option<DirectoryGroupEntry>> {
        let mut session = self.session()?;
        self.find(session.as_mut(), identity)
    }

    /// Create the group entry and return its DN.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DirectoryWriteFailed`] if the directory rejects the add,
    /// e.g. because the name is taken or the bind account lacks permission.
    pub fn create_group(&self, identity: &str, comment: &str, members: &[String]) -> Result<String> {
        let mut session = self.session()?;
        self.create(session.as_mut(), identity, comment, members)
    }

    fn create(
        &self,
        session: &mut dyn Session,
        identity: &str,
        comment: &str,
        members: &[String],
    ) -> Result<String> {
        let dn = self.config.group_dn(identity);
        let attributes: Vec<_> = group_attributes(comment, members)
            .into_iter()
            .filter(|attr| !attr.values.is_empty())
            .collect();

        session.add(&dn, &attributes)?;
        info!(group = identity, dn = %dn, "Created directory group");
        Ok(dn)
    }

    /// Compare the directory entry with the desired state without writing.
    pub fn diff_group(&self, identity: &str, comment: &str, members: &[String]) -> Result<GroupDrift> {
        let observed = self.group_exists(identity)?;
        Ok(GroupDrift::compute(observed.as_ref(), comment, members))
    }

    /// Bring the group entry in line with `comment` and `members`.
    ///
    /// Creates the entry if it is missing. If it exists and differs, replaces
    /// object class, description and members in a single modify request. If it
    /// already matches, nothing is written.
    pub fn reconcile_group(
        &self,
        identity: &str,
        comment: &str,
        members: &[String],
    ) -> Result<GroupReconcile> {
        let mut session = self.session()?;
        let observed = self.find(session.as_mut(), identity)?;
        let drift = GroupDrift::compute(observed.as_ref(), comment, members);

        match (drift.status, observed) {
            (DriftStatus::InSync, Some(entry)) => {
                debug!(group = identity, dn = %entry.distinguished_name, "Directory group already in sync");
                Ok(GroupReconcile {
                    distinguished_name: entry.distinguished_name,
                    action: GroupAction::Unchanged,
                })
            }
            (_, Some(entry)) => {
                let dn = entry.distinguished_name;
                session.modify(&dn, &group_attributes(comment, members))?;
                info!(
                    group = identity,
                    dn = %dn,
                    changes = ?drift.describe(),
                    "Corrected directory group drift"
                );
                Ok(GroupReconcile {
                    distinguished_name: dn,
                    action: GroupAction::Modified,
                })
            }
            (_, None) => {
                let dn = self.create(session.as_mut(), identity, comment, members)?;
                Ok(GroupReconcile {
                    distinguished_name: dn,
                    action: GroupAction::Created,
                })
            }
        }
    }

    /// Delete the group entry and return the DN that was removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GroupNotFound`] if no entry exists for `identity`,
    /// including when it disappears between the search and the delete.
    pub fn delete_group(&self, identity: &str) -> Result<String> {
        let mut session = self.session()?;
        let entry = self
            .find(session.as_mut(), identity)?
            .ok_or_else(|| Error::GroupNotFound {
                identity: identity.to_string(),
            })?;

        let dn = entry.distinguished_name;
        session.delete(&dn).map_err(|e| match e {
            Error::GroupNotFound { .. } => Error::GroupNotFound {
                identity: identity.to_string(),
            },
            other => other,
        })?;

        info!(group = identity, dn = %dn, "Deleted directory group");
        Ok(dn)
    }
}
