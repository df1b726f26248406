use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::StoreError;
use crate::paths::temp_path_for;

/// Atomic JSON record persistence.
///
/// Invariant: the destination path only ever changes through a rename of a
/// fully written and synced sibling file, so readers observe either the prior
/// content or the new content.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordStore;

impl RecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    pub fn read<T: DeserializeOwned>(&self, path: &Path) -> Result<T, StoreError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::not_found(path));
            }
            Err(source) => return Err(StoreError::io("reading record", path, source)),
        };

        serde_json::from_slice(&bytes).map_err(|source| StoreError::corrupt(path, source))
    }

    /// Like [`RecordStore::read`], with a missing path mapped to `None`.
    pub fn read_optional<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>, StoreError> {
        match self.read(path) {
            Ok(value) => Ok(Some(value)),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(error) => Err(error),
        }
    }

    pub fn write<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        self.stage(path, value)?.commit()
    }

    /// Writes and syncs the temporary sibling without publishing it.
    pub fn stage<T: Serialize>(&self, path: &Path, value: &T) -> Result<StagedWrite, StoreError> {
        let mut body =
            serde_json::to_vec_pretty(value).map_err(|source| StoreError::serialize(path, source))?;
        body.push(b'\n');

        let temp_path = temp_path_for(path);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .map_err(|source| StoreError::write("creating temp file", &temp_path, source))?;
        let staged = StagedWrite {
            temp_path,
            destination: path.to_path_buf(),
            committed: false,
        };

        file.write_all(&body)
            .map_err(|source| StoreError::write("writing temp file", &staged.temp_path, source))?;
        file.sync_all()
            .map_err(|source| StoreError::write("syncing temp file", &staged.temp_path, source))?;

        Ok(staged)
    }

    pub fn remove(&self, path: &Path) -> Result<(), StoreError> {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "record removed");
                sync_parent(path)
            }
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::not_found(path))
            }
            Err(source) => Err(StoreError::write("removing record", path, source)),
        }
    }
}

/// A fully written temporary file waiting to replace its destination.
///
/// Dropping an uncommitted write removes the temporary file. Leaking it
/// (`mem::forget`, or the process dying) leaves an orphan that readers never
/// see, since nothing but [`StagedWrite::commit`] touches the destination.
#[derive(Debug)]
pub struct StagedWrite {
    temp_path: PathBuf,
    destination: PathBuf,
    committed: bool,
}

impl StagedWrite {
    #[must_use]
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn commit(mut self) -> Result<(), StoreError> {
        fs::rename(&self.temp_path, &self.destination).map_err(|source| {
            StoreError::write("renaming temp file over record", &self.destination, source)
        })?;
        self.committed = true;
        debug!(path = %self.destination.display(), "record written");
        sync_parent(&self.destination)
    }
}

impl Drop for StagedWrite {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}

#[cfg(unix)]
fn sync_parent(path: &Path) -> Result<(), StoreError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    File::open(parent)
        .and_then(|dir| dir.sync_all())
        .map_err(|source| StoreError::write("syncing directory", parent, source))
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}
