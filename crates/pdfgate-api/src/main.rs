//! # pdfgate — Binary Entry Point
//!
//! Loads configuration from the environment, opens the vault, audits it,
//! starts the sweeper and serves HTTP until Ctrl-C or SIGTERM.

use pdfgate_api::{AppConfig, AppState};
use pdfgate_vault::Vault;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Configuration invalid: {e}");
        e
    })?;
    tracing::info!(?config, "configuration loaded");

    let vault = Vault::open(&config.upload_dir, &config.metadata_file).map_err(|e| {
        tracing::error!("Failed to open storage: {e}");
        e
    })?;
    vault.audit()?;

    let shutdown = CancellationToken::new();
    let sweeper = pdfgate_api::sweeper::spawn_sweeper(
        vault.clone(),
        config.sweep_interval,
        shutdown.clone(),
    );

    let port = config.port;
    let app = pdfgate_api::app(AppState::new(config, vault));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("pdfgate listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    sweeper.await?;
    tracing::info!("pdfgate stopped");
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM and cancel background work.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("termination signal received, shutting down");
    token.cancel();
}
