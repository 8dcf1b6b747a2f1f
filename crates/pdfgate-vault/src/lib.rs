//! # pdfgate-vault — Access Control and Lifecycle
//!
//! Everything that decides who may see an uploaded document and for how
//! long, with no knowledge of HTTP.
//!
//! ## Components
//!
//! | Component | Module | Role |
//! |-----------|--------|------|
//! | Artifact Store | [`artifact`] | write-once document bytes on disk |
//! | Metadata Registry | [`registry`] | persisted id → [`AccessRecord`](pdfgate_core::AccessRecord) table |
//! | Capability Issuer | [`issuer`] | turns an upload into an id, token and expiry |
//! | Access Guard | [`guard`] | validates id + token + expiry on every read |
//! | Reclamation Sweeper | [`sweeper`] | deletes expired artifacts and their records |
//! | Startup Audit | [`audit`] | reports drift between registry and store |
//!
//! ## Invariant
//!
//! A live record exists in the registry if and only if its artifact exists
//! in the store. The issuer writes bytes before the record and removes the
//! bytes again if the record cannot be persisted; the sweeper deletes bytes
//! before the record and keeps the record when the bytes cannot be deleted.
//!
//! ## Blocking
//!
//! All operations perform synchronous filesystem I/O. Async callers run
//! them on a blocking thread pool.

pub mod artifact;
pub mod audit;
pub mod error;
pub mod guard;
pub mod issuer;
pub mod registry;
pub mod sweeper;

use std::path::PathBuf;
use std::sync::Arc;

use pdfgate_core::{Clock, EpochMillis, SystemClock};

pub use artifact::ArtifactStore;
pub use audit::AuditReport;
pub use error::{AccessError, IssueError, VaultError};
pub use guard::Grant;
pub use issuer::{IssuedLink, Upload};
pub use registry::{MetadataRegistry, Slot};
pub use sweeper::SweepReport;

/// Shared handle to the artifact store, the registry and the clock.
///
/// Cheap to clone; clones share the same registry.
#[derive(Debug, Clone)]
pub struct Vault {
    artifacts: ArtifactStore,
    registry: Arc<MetadataRegistry>,
    clock: Arc<dyn Clock>,
}

impl Vault {
    /// Open the store directory and load the registry, using the system clock.
    pub fn open(
        upload_dir: impl Into<PathBuf>,
        metadata_path: impl Into<PathBuf>,
    ) -> Result<Self, VaultError> {
        Self::open_with_clock(upload_dir, metadata_path, Arc::new(SystemClock))
    }

    /// Open with an explicit clock.
    pub fn open_with_clock(
        upload_dir: impl Into<PathBuf>,
        metadata_path: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, VaultError> {
        let artifacts = ArtifactStore::open(upload_dir)?;
        let registry = Arc::new(MetadataRegistry::load(metadata_path)?);
        Ok(Self {
            artifacts,
            registry,
            clock,
        })
    }

    /// The artifact store.
    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// The metadata registry.
    pub fn registry(&self) -> &MetadataRegistry {
        &self.registry
    }

    /// Current time according to the injected clock.
    pub fn now(&self) -> EpochMillis {
        self.clock.now()
    }
}
