//! # Sweeper Task
//!
//! Runs [`Vault::sweep_once`] on a fixed period until cancelled. A pass is
//! blocking filesystem work, so it runs on the blocking pool; the interval
//! delays rather than bursts if a pass overruns its slot.

use std::time::Duration;

use pdfgate_vault::Vault;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Spawn the periodic sweeper. The first pass runs one full period after
/// startup.
pub fn spawn_sweeper(vault: Vault, period: Duration, token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await; // Skip immediate tick.

        tracing::info!(period_secs = period.as_secs(), "sweeper started");
        loop {
            tokio::select! {
                () = token.cancelled() => break,
                _ = interval.tick() => run_pass(&vault).await,
            }
        }
        tracing::info!("sweeper stopped");
    })
}

async fn run_pass(vault: &Vault) {
    let vault = vault.clone();
    match tokio::task::spawn_blocking(move || vault.sweep_once()).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "sweep pass failed"),
        Err(e) => tracing::error!(error = %e, "sweep task panicked"),
    }
}
