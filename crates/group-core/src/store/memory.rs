//! In-process store

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use super::{DesiredStateStore, Written, admit_create, admit_deletion, admit_update};
use crate::resource::DesiredGroup;
use crate::{Error, Result};

#[derive(Debug, Default)]
struct Inner {
    objects: BTreeMap<String, DesiredGroup>,
    /// Every successfully written object, oldest first
    history: Vec<DesiredGroup>,
    /// Updates that will be refused as if another writer got there first
    pending_conflicts: usize,
}

/// Store keeping every object in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| Error::Config {
            message: "memory store lock poisoned".to_string(),
        })
    }

    /// Make the next `count` updates fail with a conflict, bumping the stored
    /// version as a concurrent writer would.
    pub fn inject_conflicts(&self, count: usize) -> Result<()> {
        self.lock()?.pending_conflicts = count;
        Ok(())
    }

    /// Objects written by `update`, `create` and `request_deletion`, oldest first
    pub fn history(&self) -> Result<Vec<DesiredGroup>> {
        Ok(self.lock()?.history.clone())
    }

    /// Replace an object without version checks, e.g. to simulate an author's edit.
    pub fn put(&self, group: DesiredGroup) -> Result<()> {
        let mut inner = self.lock()?;
        inner.objects.insert(group.identity().to_string(), group);
        Ok(())
    }
}

impl DesiredStateStore for MemoryStore {
    fn get(&self, identity: &str) -> Result<Option<DesiredGroup>> {
        Ok(self.lock()?.objects.get(identity).cloned())
    }

    fn update(&self, group: &DesiredGroup) -> Result<DesiredGroup> {
        let mut inner = self.lock()?;
        let identity = group.identity().to_string();
        let pending = inner.pending_conflicts;

        let stored = inner
            .objects
            .get_mut(&identity)
            .ok_or_else(|| Error::NotFound {
                identity: identity.clone(),
            })?;

        if pending > 0 {
            stored.metadata.resource_version += 1;
            let found = stored.metadata.resource_version;
            inner.pending_conflicts -= 1;
            return Err(Error::PersistConflict {
                identity,
                expected: group.metadata.resource_version,
                found,
            });
        }

        match admit_update(stored, group)? {
            Written::Kept(next) => {
                *stored = next.clone();
                inner.history.push(next.clone());
                Ok(next)
            }
            Written::Removed(next) => {
                inner.objects.remove(&identity);
                inner.history.push(next.clone());
                debug!(group = %identity, "Released object removed from memory store");
                Ok(next)
            }
        }
    }

    fn create(&self, group: DesiredGroup) -> Result<DesiredGroup> {
        let mut inner = self.lock()?;
        if inner.objects.contains_key(group.identity()) {
            return Err(Error::AlreadyExists {
                identity: group.identity().to_string(),
            });
        }

        let created = admit_create(group)?;
        inner
            .objects
            .insert(created.identity().to_string(), created.clone());
        inner.history.push(created.clone());
        Ok(created)
    }

    fn request_deletion(&self, identity: &str) -> Result<Option<DesiredGroup>> {
        let mut inner = self.lock()?;
        let stored = inner.objects.get(identity).ok_or_else(|| Error::NotFound {
            identity: identity.to_string(),
        })?;

        match admit_deletion(stored) {
            Written::Kept(next) => {
                inner.objects.insert(identity.to_string(), next.clone());
                inner.history.push(next.clone());
                Ok(Some(next))
            }
            Written::Removed(next) => {
                inner.objects.remove(identity);
                inner.history.push(next);
                Ok(None)
            }
        }
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.objects.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn store_with_group() -> (MemoryStore, DesiredGroup) {
        let store = MemoryStore::new();
        let group = store
            .create(DesiredGroup::new("team-x", "Team X", vec!["uid=a".to_string()]))
            .unwrap();
        (store, group)
    }

    #[test]
    fn create_assigns_uid_and_version() {
        let (store, group) = store_with_group();
        assert!(group.metadata.uid.is_some());
        assert_eq!(group.metadata.resource_version, 1);
        assert!(matches!(
            store.create(DesiredGroup::new("team-x", "", Vec::new())),
            Err(Error::AlreadyExists { .. })
        ));
    }

    #[test]
    fn update_bumps_version_and_rejects_stale_copies() {
        let (store, mut group) = store_with_group();
        group.add_finalizer();
        let updated = store.update(&group).unwrap();
        assert_eq!(updated.metadata.resource_version, 2);

        assert!(store.update(&group).unwrap_err().is_conflict());
    }

    #[test]
    fn injected_conflicts_are_consumed() {
        let (store, group) = store_with_group();
        store.inject_conflicts(1).unwrap();

        assert!(store.update(&group).unwrap_err().is_conflict());
        let fresh = store.get("team-x").unwrap().unwrap();
        assert_eq!(fresh.metadata.resource_version, 2);
        assert!(store.update(&fresh).is_ok());
    }

    #[test]
    fn deletion_waits_for_finalizer() {
        let (store, mut group) = store_with_group();
        group.add_finalizer();
        store.update(&group).unwrap();

        let pending = store.request_deletion("team-x").unwrap().unwrap();
        assert!(pending.deletion_requested());
        assert_eq!(store.list().unwrap(), vec!["team-x"]);

        let mut pending = pending;
        pending.remove_finalizer();
        store.update(&pending).unwrap();
        assert!(store.get("team-x").unwrap().is_none());
    }

    #[test]
    fn deletion_without_finalizer_is_immediate() {
        let (store, _) = store_with_group();
        assert!(store.request_deletion("team-x").unwrap().is_none());
        assert!(store.list().unwrap().is_empty());
    }
}
