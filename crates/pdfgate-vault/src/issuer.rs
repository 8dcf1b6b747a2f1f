//! # Capability Issuer
//!
//! Turns an accepted upload into a stored artifact plus a registered
//! [`AccessRecord`], and hands back the viewer link.
//!
//! ## Ordering
//!
//! 1. Payload present and declared type is PDF, otherwise refused before
//!    anything touches the store.
//! 2. Bytes written atomically under `{id}.{ext}`.
//! 3. Record inserted and the registry flushed.
//! 4. Link returned.
//!
//! The link is only returned after step 3 has reached disk, so a concurrent
//! view request can always resolve it. If step 3 fails the bytes from step
//! 2 are deleted again.

use pdfgate_core::{stored_name_for, AccessRecord, AccessToken, ArtifactId, EpochMillis, Lifetime};

use crate::error::IssueError;
use crate::Vault;

/// An upload as received from a client.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    /// File bytes; `None` when the request had no file part.
    pub bytes: Option<Vec<u8>>,
    /// Declared content type of the file part.
    pub content_type: String,
    /// Client-supplied file name.
    pub original_name: String,
    /// Raw `expiresMinutes` value, if supplied.
    pub requested_minutes: Option<String>,
}

/// The capability handed back to the uploader.
#[derive(Debug, Clone)]
pub struct IssuedLink {
    pub id: ArtifactId,
    pub token: AccessToken,
    /// `{base_url}/view/{id}?t={token}`.
    pub viewer: String,
    pub expires_at: EpochMillis,
}

/// Whether a declared content type denotes a PDF document.
pub fn is_pdf_content_type(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("pdf")
}

/// Compose the viewer link for an issued capability.
pub fn viewer_link(base_url: &str, id: &ArtifactId, token: &AccessToken) -> String {
    format!(
        "{}/view/{}?t={}",
        base_url.trim_end_matches('/'),
        id,
        token.as_str()
    )
}

impl Vault {
    /// Store an upload and register a time-limited capability for it.
    pub fn issue(&self, upload: Upload, base_url: &str) -> Result<IssuedLink, IssueError> {
        let bytes = upload.bytes.ok_or(IssueError::MissingPayload)?;
        if !is_pdf_content_type(&upload.content_type) {
            return Err(IssueError::UnsupportedType {
                content_type: upload.content_type,
            });
        }

        let lifetime = Lifetime::from_request(upload.requested_minutes.as_deref());
        let id = ArtifactId::new();
        let token = AccessToken::generate();
        let stored_name = stored_name_for(&id, &upload.original_name);

        self.artifacts.write_new(&stored_name, &bytes)?;

        let expires_at = self.clock.now().plus(lifetime);
        let record = AccessRecord {
            id,
            stored_name: stored_name.clone(),
            original_name: upload.original_name,
            token: token.clone(),
            expires_at,
        };

        if let Err(e) = self.registry.upsert_and_flush(record) {
            if let Err(cleanup) = self.artifacts.delete(&stored_name) {
                tracing::error!(%id, error = %cleanup, "failed to remove artifact after registry flush failure");
            }
            return Err(e.into());
        }

        tracing::info!(
            %id,
            size = bytes.len(),
            lifetime_minutes = lifetime.minutes(),
            %expires_at,
            "capability issued"
        );

        Ok(IssuedLink {
            viewer: viewer_link(base_url, &id, &token),
            id,
            token,
            expires_at,
        })
    }
}
