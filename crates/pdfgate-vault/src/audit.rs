//! # Startup Audit
//!
//! Compares the registry with the artifact directory once, before the
//! server starts accepting uploads. Interrupted staging writes are cleared;
//! everything else is reported and logged but left in place. A record whose
//! bytes are missing is still reclaimed by the sweeper when it expires, and
//! orphaned bytes are never deleted automatically.

use std::collections::BTreeSet;

use pdfgate_core::ArtifactId;

use crate::error::VaultError;
use crate::Vault;

/// Discrepancies found between the registry and the artifact store.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AuditReport {
    /// Live records with no artifact bytes.
    pub missing_artifacts: Vec<ArtifactId>,
    /// Artifact files no record refers to.
    pub orphaned_artifacts: Vec<String>,
    /// Staging files removed.
    pub stale_staging_removed: usize,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.missing_artifacts.is_empty() && self.orphaned_artifacts.is_empty()
    }
}

impl Vault {
    /// Reconcile the registry against the artifact directory.
    ///
    /// Must run before any upload is accepted: staging files from a write
    /// in progress would otherwise be removed.
    pub fn audit(&self) -> Result<AuditReport, VaultError> {
        let stale_staging_removed = self.artifacts.remove_stale_staging()?;
        if stale_staging_removed > 0 {
            tracing::warn!(count = stale_staging_removed, "removed interrupted artifact writes");
        }

        let on_disk: BTreeSet<String> = self.artifacts.stored_names()?.into_iter().collect();
        let mut referenced = BTreeSet::new();
        let mut missing_artifacts = Vec::new();

        for (_, slot) in self.registry.scan_all() {
            let Some(record) = slot.record() else { continue };
            if !on_disk.contains(&record.stored_name) {
                tracing::error!(
                    id = %record.id,
                    stored_name = %record.stored_name,
                    "registry entry has no artifact bytes"
                );
                missing_artifacts.push(record.id);
            }
            referenced.insert(record.stored_name.clone());
        }

        let orphaned_artifacts: Vec<String> = on_disk.difference(&referenced).cloned().collect();
        for name in &orphaned_artifacts {
            tracing::warn!(stored_name = %name, "artifact has no registry entry");
        }

        let report = AuditReport {
            missing_artifacts,
            orphaned_artifacts,
            stale_staging_removed,
        };
        tracing::info!(
            records = self.registry.len(),
            artifacts = on_disk.len(),
            missing = report.missing_artifacts.len(),
            orphaned = report.orphaned_artifacts.len(),
            "startup audit complete"
        );
        Ok(report)
    }
}
