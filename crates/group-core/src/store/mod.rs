//! Desired-state stores
//!
//! The reconciler only needs `get` and `update`; the dispatcher and the CLI use
//! `list`, `create` and `request_deletion`. Both implementations share the same
//! rules:
//!
//! - `update` succeeds only if the caller's `resource_version` matches the
//!   stored one, and bumps it
//! - authors cannot clear a deletion request through `update`
//! - an object with deletion requested and no finalizers is removed

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use chrono::Utc;
use uuid::Uuid;

use crate::resource::DesiredGroup;
use crate::{Error, Result};

/// Source of truth for desired groups
pub trait DesiredStateStore: Send + Sync {
    /// Fetch the current object, `None` if it does not exist.
    fn get(&self, identity: &str) -> Result<Option<DesiredGroup>>;

    /// Persist a modified object and return it with its new resource version.
    ///
    /// # Errors
    ///
    /// - [`Error::PersistConflict`] if the object changed since it was read
    /// - [`Error::NotFound`] if the object no longer exists
    fn update(&self, group: &DesiredGroup) -> Result<DesiredGroup>;

    /// Store a new object.
    fn create(&self, group: DesiredGroup) -> Result<DesiredGroup>;

    /// Mark an object for deletion. Returns the object if finalizers still
    /// hold it, `None` if it was removed.
    fn request_deletion(&self, identity: &str) -> Result<Option<DesiredGroup>>;

    /// Identities of every stored object
    fn list(&self) -> Result<Vec<String>>;
}

/// Outcome of applying a write to a stored object
pub(crate) enum Written {
    Kept(DesiredGroup),
    Removed(DesiredGroup),
}

/// Check that `identity` can name an object on disk and in the directory.
pub(crate) fn validate_identity(identity: &str) -> Result<()> {
    let reason = if identity.trim().is_empty() {
        Some("identity is empty")
    } else if identity.starts_with('.') {
        Some("identity cannot start with '.'")
    } else if identity.contains(['/', '\\']) {
        Some("identity cannot contain path separators")
    } else if identity.chars().any(char::is_control) {
        Some("identity cannot contain control characters")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(Error::InvalidIdentity {
            identity: identity.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// Prepare a new object for its first write.
pub(crate) fn admit_create(mut group: DesiredGroup) -> Result<DesiredGroup> {
    validate_identity(group.identity())?;
    group.metadata.uid = Some(Uuid::new_v4());
    group.metadata.resource_version = 1;
    group.metadata.creation_timestamp = Some(Utc::now());
    group.metadata.deletion_timestamp = None;
    Ok(group)
}

/// Apply an update on top of the stored object.
pub(crate) fn admit_update(stored: &DesiredGroup, incoming: &DesiredGroup) -> Result<Written> {
    if stored.metadata.resource_version != incoming.metadata.resource_version {
        return Err(Error::PersistConflict {
            identity: stored.identity().to_string(),
            expected: incoming.metadata.resource_version,
            found: stored.metadata.resource_version,
        });
    }

    let mut next = incoming.clone();
    next.metadata.uid = stored.metadata.uid;
    next.metadata.creation_timestamp = stored.metadata.creation_timestamp;
    next.metadata.deletion_timestamp = stored.metadata.deletion_timestamp;
    next.metadata.resource_version = stored.metadata.resource_version + 1;

    Ok(if next.is_releasable() {
        Written::Removed(next)
    } else {
        Written::Kept(next)
    })
}

/// Apply a deletion request to the stored object.
pub(crate) fn admit_deletion(stored: &DesiredGroup) -> Written {
    if stored.deletion_requested() {
        return Written::Kept(stored.clone());
    }

    let mut next = stored.clone();
    next.metadata.deletion_timestamp = Some(Utc::now());
    next.metadata.resource_version += 1;

    if next.is_releasable() {
        Written::Removed(next)
    } else {
        Written::Kept(next)
    }
}
