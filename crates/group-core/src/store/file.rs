//! Store persisting one TOML document per object
//!
//! Documents live at `<root>/<identity>.toml`. Reads take a shared lock and
//! writes an exclusive lock on `<root>/.store.lock`; documents are written to a
//! temporary file and renamed into place.

use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use tracing::debug;

use super::{
    DesiredStateStore, Written, admit_create, admit_deletion, admit_update, validate_identity,
};
use crate::resource::DesiredGroup;
use crate::scheme::SchemeRegistry;
use crate::{Error, Result};

const LOCK_FILE: &str = ".store.lock";
const EXTENSION: &str = "toml";

/// Directory-backed store
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    scheme: Arc<SchemeRegistry>,
}

impl FileStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>, scheme: Arc<SchemeRegistry>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root, scheme })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the document for `identity`
    pub fn path_for(&self, identity: &str) -> Result<PathBuf> {
        validate_identity(identity)?;
        Ok(self.root.join(format!("{}.{}", identity, EXTENSION)))
    }

    fn lock(&self, exclusive: bool) -> Result<File> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.root.join(LOCK_FILE))?;

        if exclusive {
            file.lock_exclusive()?;
        } else {
            file.lock_shared()?;
        }
        // Lock released when the file is dropped
        Ok(file)
    }

    fn read(&self, path: &Path) -> Result<Option<DesiredGroup>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        self.scheme
            .decode_group(&content)
            .map(Some)
            .map_err(|e| Error::InvalidDocument {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }

    fn write(&self, path: &Path, group: &DesiredGroup) -> Result<()> {
        let content = self.scheme.encode_group(group)?;
        let temp_path = path.with_extension("toml.tmp");
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }

    fn persist(&self, path: &Path, written: Written) -> Result<(DesiredGroup, bool)> {
        match written {
            Written::Kept(next) => {
                self.write(path, &next)?;
                Ok((next, true))
            }
            Written::Removed(next) => {
                match fs::remove_file(path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
                debug!(group = %next.identity(), path = %path.display(), "Released object removed from file store");
                Ok((next, false))
            }
        }
    }
}

impl DesiredStateStore for FileStore {
    fn get(&self, identity: &str) -> Result<Option<DesiredGroup>> {
        let path = self.path_for(identity)?;
        let _lock = self.lock(false)?;
        self.read(&path)
    }

    fn update(&self, group: &DesiredGroup) -> Result<DesiredGroup> {
        let path = self.path_for(group.identity())?;
        let _lock = self.lock(true)?;

        let stored = self.read(&path)?.ok_or_else(|| Error::NotFound {
            identity: group.identity().to_string(),
        })?;
        let (next, _) = self.persist(&path, admit_update(&stored, group)?)?;
        Ok(next)
    }

    fn create(&self, group: DesiredGroup) -> Result<DesiredGroup> {
        let path = self.path_for(group.identity())?;
        let _lock = self.lock(true)?;

        if path.exists() {
            return Err(Error::AlreadyExists {
                identity: group.identity().to_string(),
            });
        }

        let created = admit_create(group)?;
        self.write(&path, &created)?;
        Ok(created)
    }

    fn request_deletion(&self, identity: &str) -> Result<Option<DesiredGroup>> {
        let path = self.path_for(identity)?;
        let _lock = self.lock(true)?;

        let stored = self.read(&path)?.ok_or_else(|| Error::NotFound {
            identity: identity.to_string(),
        })?;
        let (next, kept) = self.persist(&path, admit_deletion(&stored))?;
        Ok(kept.then_some(next))
    }

    fn list(&self) -> Result<Vec<String>> {
        let _lock = self.lock(false)?;

        let mut identities = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                && !stem.starts_with('.')
            {
                identities.push(stem.to_string());
            }
        }
        identities.sort();
        Ok(identities)
    }
}
