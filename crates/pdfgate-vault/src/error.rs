//! # Error Types
//!
//! Three families, one per side of the vault:
//!
//! - [`VaultError`]: storage faults (artifact files, registry persistence).
//! - [`IssueError`]: why an upload was refused.
//! - [`AccessError`]: why a view or fetch was refused. The HTTP layer
//!   collapses every variant into one response; the variants exist so the
//!   cause can be logged.

use std::path::PathBuf;

use thiserror::Error;

/// Storage-level failure.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Filesystem operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Registry could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The persisted registry exists but is not a table of records.
    #[error("metadata file {path} is corrupt: {reason}")]
    Corrupt {
        /// Path of the registry file.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// A stored name would escape the storage directory.
    #[error("invalid stored name: {0:?}")]
    InvalidName(String),

    /// Write-once violated: an artifact with this name already exists.
    #[error("artifact already exists: {0}")]
    AlreadyExists(String),
}

/// Reasons an upload is refused.
#[derive(Error, Debug)]
pub enum IssueError {
    /// The request carried no file part.
    #[error("no file uploaded")]
    MissingPayload,

    /// The declared content type is not a PDF.
    #[error("unsupported content type: {content_type:?}")]
    UnsupportedType {
        /// The content type the client declared.
        content_type: String,
    },

    /// Persisting the artifact or the registry failed.
    #[error("storage failure: {0}")]
    StorageFailure(#[from] VaultError),
}

/// Reasons a view or fetch is refused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    /// Unknown identifier or wrong token.
    #[error("not found")]
    NotFound,

    /// The link's lifetime has elapsed.
    #[error("expired")]
    Expired,

    /// The registry references an artifact that is not on disk.
    #[error("artifact bytes missing for a registered record")]
    FileMissing,
}
