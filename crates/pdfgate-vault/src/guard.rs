//! # Access Guard
//!
//! Every view or fetch passes through [`Vault::authorize`] before the
//! artifact store is touched.
//!
//! ## Uniform Denial
//!
//! An unknown id, an unparseable id and a wrong token all produce
//! [`AccessError::NotFound`]. `Expired` and `FileMissing` are distinct only
//! so they can be logged and acted on; the HTTP layer renders all of them
//! identically.

use std::path::PathBuf;

use pdfgate_core::{AccessRecord, ArtifactId};

use crate::error::{AccessError, VaultError};
use crate::registry::Slot;
use crate::Vault;

/// Permission to stream one artifact.
#[derive(Debug, Clone)]
pub struct Grant {
    pub record: AccessRecord,
    /// Location of the artifact bytes.
    pub path: PathBuf,
}

impl Vault {
    /// Validate an id and token against the registry and the clock.
    pub fn authorize(&self, id: &str, token: &str) -> Result<AccessRecord, AccessError> {
        let id = ArtifactId::parse(id).ok_or(AccessError::NotFound)?;
        let record = self.registry.get(&id).ok_or(AccessError::NotFound)?;
        if !record.token.verify(token) {
            return Err(AccessError::NotFound);
        }
        if record.is_expired_at(self.clock.now()) {
            return Err(AccessError::Expired);
        }
        Ok(record)
    }

    /// Authorize, then confirm the artifact bytes are present.
    pub fn open_artifact(&self, id: &str, token: &str) -> Result<Grant, AccessError> {
        let record = self.authorize(id, token)?;
        let path = self
            .artifacts
            .path_of(&record.stored_name)
            .map_err(|_| AccessError::FileMissing)?;
        if !path.is_file() {
            return Err(self.classify_missing(id, token));
        }
        Ok(Grant { record, path })
    }

    /// Explain why bytes that a grant pointed at are gone.
    ///
    /// A sweep deletes expired bytes before it drops the record, so an
    /// authorization that now fails means the link lapsed in between and is
    /// reported as such. Only a capability that is still live yields
    /// [`AccessError::FileMissing`].
    pub fn classify_missing(&self, id: &str, token: &str) -> AccessError {
        match self.authorize(id, token) {
            Err(err) => err,
            Ok(_) => AccessError::FileMissing,
        }
    }

    /// Remove an expired record and its bytes ahead of the next sweep.
    ///
    /// Re-checks expiry under the registry's writer lock, so a record that
    /// is not expired (or already gone) is left alone. Returns whether a
    /// record was removed.
    pub fn reclaim_expired(&self, id: &ArtifactId) -> Result<bool, VaultError> {
        let now = self.clock.now();
        let outcome = self.registry.reclaim_one_and_flush(id, |slot| match slot {
            Slot::Live(record) if record.is_expired_at(now) => self.discard_artifact(record),
            _ => false,
        })?;
        let removed = !outcome.removed.is_empty();
        if removed {
            tracing::info!(%id, "expired capability reclaimed on access");
        }
        Ok(removed)
    }

    /// Delete an artifact's bytes, treating "already absent" as success.
    ///
    /// Returns `false` (and logs) when the bytes could not be deleted, in
    /// which case the record must be kept.
    pub(crate) fn discard_artifact(&self, record: &AccessRecord) -> bool {
        match self.artifacts.delete(&record.stored_name) {
            Ok(true) => true,
            Ok(false) => {
                tracing::warn!(id = %record.id, "artifact already absent while reclaiming");
                true
            }
            Err(e) => {
                tracing::warn!(id = %record.id, error = %e, "failed to delete artifact, keeping record");
                false
            }
        }
    }
}
