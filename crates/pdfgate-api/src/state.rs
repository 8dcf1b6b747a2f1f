//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor. Cloning is cheap: the configuration sits
//! behind an `Arc` and the vault's registry is already shared.

use std::sync::Arc;

use pdfgate_vault::Vault;

use crate::config::AppConfig;

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub vault: Vault,
}

impl AppState {
    pub fn new(config: AppConfig, vault: Vault) -> Self {
        Self {
            config: Arc::new(config),
            vault,
        }
    }
}
