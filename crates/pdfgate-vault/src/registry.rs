//! # Metadata Registry
//!
//! In-memory table of [`AccessRecord`]s keyed by artifact id, mirrored to a
//! single JSON file that is rewritten wholesale on every mutation.
//!
//! ## Locking
//!
//! Two locks with distinct jobs:
//!
//! - `table` (`RwLock`) protects the in-memory map. It is only ever held
//!   for in-memory work, so guard lookups never wait on disk I/O.
//! - `writer` (`Mutex`) serializes mutate-then-flush sequences. It is held
//!   across the flush, so the file on disk always reflects the most recent
//!   mutation and two flushes can never land out of order.
//!
//! Both are `parking_lot` locks and are never held across an `.await`.
//!
//! ## Malformed Entries
//!
//! Entries that fail to decode are kept verbatim as [`Slot::Malformed`] so
//! a flush does not silently drop them, and are removed by the sweeper.

use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use pdfgate_core::{AccessRecord, ArtifactId};
use serde::Serialize;

use crate::error::VaultError;

/// One entry of the registry table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Slot {
    /// A decodable record.
    Live(AccessRecord),
    /// Anything else found under a key in the persisted table.
    Malformed(serde_json::Value),
}

impl Slot {
    fn decode(key: &str, value: serde_json::Value) -> Self {
        match serde_json::from_value::<AccessRecord>(value.clone()) {
            Ok(record)
                if record.id.to_string() == key
                    && crate::artifact::is_valid_stored_name(&record.stored_name) =>
            {
                Self::Live(record)
            }
            _ => Self::Malformed(value),
        }
    }

    /// The record, if this slot holds one.
    pub fn record(&self) -> Option<&AccessRecord> {
        match self {
            Self::Live(record) => Some(record),
            Self::Malformed(_) => None,
        }
    }
}

#[derive(Debug, Default)]
struct WriterState {
    /// Memory holds mutations that the last flush failed to persist.
    dirty: bool,
}

/// Result of a [`MetadataRegistry::reclaim_and_flush`] call.
#[derive(Debug, Default)]
pub struct Reclaimed {
    /// Slots removed from the table, with their keys.
    pub removed: Vec<(String, Slot)>,
    /// Whether the table was written to disk.
    pub flushed: bool,
}

/// Persisted table of access records.
#[derive(Debug)]
pub struct MetadataRegistry {
    path: PathBuf,
    table: RwLock<BTreeMap<String, Slot>>,
    writer: Mutex<WriterState>,
}

impl MetadataRegistry {
    /// Load the registry from `path`.
    ///
    /// A missing or empty file yields an empty registry. A file that is
    /// present but not a JSON object is refused: starting with an empty
    /// table would erase every live link on the next flush.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, VaultError> {
        let path = path.into();
        std::fs::create_dir_all(parent_dir(&path))?;

        let table = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => decode_table(&path, &text)?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        let malformed = table
            .values()
            .filter(|s| matches!(s, Slot::Malformed(_)))
            .count();
        tracing::info!(
            path = %path.display(),
            records = table.len(),
            malformed,
            "metadata registry loaded"
        );

        Ok(Self {
            path,
            table: RwLock::new(table),
            writer: Mutex::new(WriterState::default()),
        })
    }

    /// Path of the persisted table.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a live record.
    pub fn get(&self, id: &ArtifactId) -> Option<AccessRecord> {
        self.table
            .read()
            .get(&id.to_string())
            .and_then(Slot::record)
            .cloned()
    }

    /// Number of slots, malformed included.
    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every slot.
    pub fn scan_all(&self) -> Vec<(String, Slot)> {
        self.table
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Insert or replace a record and persist the table.
    ///
    /// On a failed flush the in-memory change is rolled back, so a caller
    /// that sees an error can rely on the record not being visible.
    pub fn upsert_and_flush(&self, record: AccessRecord) -> Result<(), VaultError> {
        let mut writer = self.writer.lock();
        let key = record.id.to_string();
        let previous = self.table.write().insert(key.clone(), Slot::Live(record));

        match self.flush_locked() {
            Ok(()) => {
                writer.dirty = false;
                Ok(())
            }
            Err(e) => {
                let mut table = self.table.write();
                match previous {
                    Some(slot) => table.insert(key, slot),
                    None => table.remove(&key),
                };
                Err(e)
            }
        }
    }

    /// Remove a record and persist the table.
    ///
    /// Returns `Ok(None)` without touching the disk when the id is unknown.
    /// On a failed flush the removal is kept in memory and the registry is
    /// marked dirty, so the next successful flush persists it.
    pub fn delete_and_flush(&self, id: &ArtifactId) -> Result<Option<Slot>, VaultError> {
        let mut writer = self.writer.lock();
        let Some(removed) = self.table.write().remove(&id.to_string()) else {
            return Ok(None);
        };

        match self.flush_locked() {
            Ok(()) => {
                writer.dirty = false;
                Ok(Some(removed))
            }
            Err(e) => {
                writer.dirty = true;
                Err(e)
            }
        }
    }

    /// Remove every slot for which `decide` returns `true`, then flush once.
    ///
    /// `decide` runs with the writer lock held but not the table lock, so
    /// lookups proceed while it runs. Keep it cheap: every upload waits on
    /// the writer lock. Nothing is written when nothing was removed and no
    /// earlier flush is outstanding.
    pub fn reclaim_and_flush<F>(&self, mut decide: F) -> Result<Reclaimed, VaultError>
    where
        F: FnMut(&str, &Slot) -> bool,
    {
        let mut writer = self.writer.lock();
        let candidates = self.scan_all();

        let doomed: Vec<String> = candidates
            .iter()
            .filter(|(key, slot)| decide(key.as_str(), slot))
            .map(|(key, _)| key.clone())
            .collect();

        self.commit_removals(&mut writer, doomed)
    }

    /// Single-key form of [`reclaim_and_flush`](Self::reclaim_and_flush).
    ///
    /// `decide` is not called when `id` has no slot.
    pub fn reclaim_one_and_flush<F>(&self, id: &ArtifactId, decide: F) -> Result<Reclaimed, VaultError>
    where
        F: FnOnce(&Slot) -> bool,
    {
        let mut writer = self.writer.lock();
        let key = id.to_string();
        let current = self.table.read().get(&key).cloned();

        let doomed = match current {
            Some(slot) if decide(&slot) => vec![key],
            _ => Vec::new(),
        };

        self.commit_removals(&mut writer, doomed)
    }

    /// Drop `doomed` keys from the table and flush if anything changed.
    fn commit_removals(
        &self,
        writer: &mut WriterState,
        doomed: Vec<String>,
    ) -> Result<Reclaimed, VaultError> {
        if doomed.is_empty() && !writer.dirty {
            return Ok(Reclaimed::default());
        }

        let removed = {
            let mut table = self.table.write();
            doomed
                .into_iter()
                .filter_map(|key| table.remove(&key).map(|slot| (key, slot)))
                .collect()
        };

        match self.flush_locked() {
            Ok(()) => {
                writer.dirty = false;
                Ok(Reclaimed {
                    removed,
                    flushed: true,
                })
            }
            Err(e) => {
                writer.dirty = true;
                Err(e)
            }
        }
    }

    /// Take the writer lock and keep it until the guard drops.
    #[cfg(test)]
    pub(crate) fn hold_writer(&self) -> impl Sized + '_ {
        self.writer.lock()
    }

    /// Serialize the table and atomically replace the file.
    ///
    /// Callers must hold `writer`.
    fn flush_locked(&self) -> Result<(), VaultError> {
        let bytes = {
            let table = self.table.read();
            serde_json::to_vec_pretty(&*table)?
        };

        let mut staged = tempfile::Builder::new()
            .prefix(".metadata-")
            .tempfile_in(parent_dir(&self.path))?;
        staged.write_all(&bytes)?;
        staged.as_file().sync_all()?;
        staged.persist(&self.path).map_err(|e| VaultError::Io(e.error))?;

        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "metadata registry flushed");
        Ok(())
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

fn decode_table(path: &Path, text: &str) -> Result<BTreeMap<String, Slot>, VaultError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| VaultError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    let serde_json::Value::Object(map) = value else {
        return Err(VaultError::Corrupt {
            path: path.to_path_buf(),
            reason: "top-level value is not an object".to_string(),
        });
    };
    Ok(map
        .into_iter()
        .map(|(key, value)| {
            let slot = Slot::decode(&key, value);
            (key, slot)
        })
        .collect())
}
