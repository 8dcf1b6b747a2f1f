//! # Artifact Store
//!
//! Flat directory of uploaded documents, one file per artifact, named by
//! the record's stored name (`{id}.{ext}`).
//!
//! ## Integrity Invariant
//!
//! Artifacts are write-once and appear atomically. Bytes are staged in a
//! hidden temporary file in the same directory, fsynced, and then linked
//! into place with no-clobber semantics. A reader therefore sees either the
//! complete artifact or nothing; a crash mid-write leaves only a hidden
//! staging file, which [`ArtifactStore::remove_stale_staging`] clears.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::VaultError;

/// Prefix of staging files; stored names can never start with a dot.
const STAGING_PREFIX: &str = ".staging-";

/// Whether `name` is a single, non-hidden path component.
pub(crate) fn is_valid_stored_name(name: &str) -> bool {
    !(name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0'])
        || name.len() > 255)
}

fn validate_stored_name(name: &str) -> Result<(), VaultError> {
    if !is_valid_stored_name(name) {
        return Err(VaultError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Filesystem-backed, write-once artifact storage.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    base_dir: PathBuf,
}

impl ArtifactStore {
    /// Open the store, creating the directory if needed.
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self, VaultError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Return the base directory path.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of an artifact by stored name.
    pub fn path_of(&self, stored_name: &str) -> Result<PathBuf, VaultError> {
        validate_stored_name(stored_name)?;
        Ok(self.base_dir.join(stored_name))
    }

    /// Atomically create a new artifact.
    ///
    /// Fails with [`VaultError::AlreadyExists`] rather than overwrite.
    pub fn write_new(&self, stored_name: &str, bytes: &[u8]) -> Result<PathBuf, VaultError> {
        let path = self.path_of(stored_name)?;

        // Dropped (and unlinked) on every early return below.
        let mut staged = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempfile_in(&self.base_dir)?;
        staged.write_all(bytes)?;
        staged.as_file().sync_all()?;

        staged.persist_noclobber(&path).map_err(|err| {
            if err.error.kind() == ErrorKind::AlreadyExists {
                VaultError::AlreadyExists(stored_name.to_string())
            } else {
                VaultError::Io(err.error)
            }
        })?;

        tracing::debug!(stored_name, size = bytes.len(), "artifact written");
        Ok(path)
    }

    /// Check whether an artifact exists.
    pub fn exists(&self, stored_name: &str) -> bool {
        self.path_of(stored_name)
            .map(|p| p.is_file())
            .unwrap_or(false)
    }

    /// Read an artifact, or `None` if it is absent.
    pub fn read(&self, stored_name: &str) -> Result<Option<Vec<u8>>, VaultError> {
        let path = self.path_of(stored_name)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete an artifact.
    ///
    /// Idempotent: returns `Ok(false)` if it was already gone.
    pub fn delete(&self, stored_name: &str) -> Result<bool, VaultError> {
        let path = self.path_of(stored_name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Names of all committed artifacts, sorted.
    pub fn stored_names(&self) -> Result<Vec<String>, VaultError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if validate_stored_name(name).is_ok() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Remove staging files left behind by an interrupted write.
    ///
    /// Only safe before the store starts accepting uploads.
    pub fn remove_stale_staging(&self) -> Result<usize, VaultError> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            let is_staging = entry
                .file_name()
                .to_str()
                .is_some_and(|n| n.starts_with(STAGING_PREFIX));
            if is_staging && entry.file_type()?.is_file() {
                match fs::remove_file(entry.path()) {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(removed)
    }
}
