//! # Access Records
//!
//! One [`AccessRecord`] exists per uploaded artifact. Records are immutable
//! from creation until removal; there is no renewal path.
//!
//! The serialized field names (`fileName`, `originalName`, `expiresAt`) match
//! the metadata table layout already in use on deployed hosts, so an existing
//! `metadata.json` loads without migration.

use serde::{Deserialize, Serialize};

use crate::identity::{AccessToken, ArtifactId};
use crate::temporal::EpochMillis;

/// Extension used when the original name carries none we accept.
pub const DEFAULT_EXTENSION: &str = "pdf";

/// Longest extension carried over from the client-supplied name.
const MAX_EXTENSION_LEN: usize = 16;

/// Access-control record for one uploaded artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRecord {
    pub id: ArtifactId,
    /// On-disk artifact name: `{id}.{ext}`.
    #[serde(rename = "fileName")]
    pub stored_name: String,
    /// Client-supplied display name. Untrusted.
    pub original_name: String,
    pub token: AccessToken,
    pub expires_at: EpochMillis,
}

impl AccessRecord {
    /// Whether the record has expired at `now`.
    ///
    /// A record whose expiry equals `now` is still live.
    pub fn is_expired_at(&self, now: EpochMillis) -> bool {
        now > self.expires_at
    }
}

/// Derive the on-disk name for an artifact from its id and the client's
/// file name.
///
/// Only the extension of the original name is used, and only when it is
/// short ASCII alphanumerics, so the result never contains a path separator.
pub fn stored_name_for(id: &ArtifactId, original_name: &str) -> String {
    let ext = extension_of(original_name).unwrap_or(DEFAULT_EXTENSION);
    format!("{id}.{ext}")
}

fn extension_of(name: &str) -> Option<&str> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > MAX_EXTENSION_LEN {
        return None;
    }
    if !ext.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext)
}
