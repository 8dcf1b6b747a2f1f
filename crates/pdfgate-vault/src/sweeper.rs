//! # Reclamation Sweeper
//!
//! One pass over the registry: expired records lose their artifact bytes
//! and then their entry; malformed entries are dropped outright. Bytes are
//! deleted from a snapshot before the registry's writer lock is taken, so
//! uploads only ever wait for the final table update. The
//! registry is written at most once per pass, and not at all when nothing
//! changed.
//!
//! Scheduling is the caller's concern (the API binary runs a pass on a
//! fixed interval); this module only defines what a pass does.

use std::collections::HashSet;

use pdfgate_core::EpochMillis;

use crate::error::VaultError;
use crate::registry::Slot;
use crate::Vault;

/// Outcome of one sweep pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Time the pass evaluated expiry against.
    pub now: Option<EpochMillis>,
    /// Expired records removed.
    pub expired: usize,
    /// Malformed entries removed.
    pub malformed: usize,
    /// Expired records whose bytes could not be deleted; kept for next pass.
    pub deferred: usize,
    /// Whether the registry was rewritten.
    pub flushed: bool,
}

impl SweepReport {
    /// Total entries removed from the registry.
    pub fn removed(&self) -> usize {
        self.expired + self.malformed
    }
}

impl Vault {
    /// Run one reclamation pass.
    pub fn sweep_once(&self) -> Result<SweepReport, VaultError> {
        let now = self.clock.now();
        let mut report = SweepReport {
            now: Some(now),
            ..SweepReport::default()
        };

        // Expired records never become live again, so their bytes can go
        // before the writer lock is taken. Only the table update waits on it.
        let mut discarded = HashSet::new();
        for (key, slot) in self.registry.scan_all() {
            if let Slot::Live(record) = &slot {
                if record.is_expired_at(now) {
                    if self.discard_artifact(record) {
                        discarded.insert(key);
                    } else {
                        report.deferred += 1;
                    }
                }
            }
        }

        let outcome = self.registry.reclaim_and_flush(|key, slot| match slot {
            Slot::Malformed(_) => {
                tracing::warn!(key, "dropping malformed registry entry");
                report.malformed += 1;
                true
            }
            Slot::Live(_) if discarded.contains(key) => {
                report.expired += 1;
                true
            }
            Slot::Live(_) => false,
        })?;
        report.flushed = outcome.flushed;

        if report.removed() > 0 || report.deferred > 0 {
            tracing::info!(
                expired = report.expired,
                malformed = report.malformed,
                deferred = report.deferred,
                remaining = self.registry.len(),
                "sweep pass complete"
            );
        } else {
            tracing::debug!(remaining = self.registry.len(), "sweep pass found nothing to reclaim");
        }

        Ok(report)
    }
}
