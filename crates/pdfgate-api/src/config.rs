//! # Server Configuration
//!
//! Read once from the environment at startup. Unset or blank variables take
//! their defaults; values that are present but unparseable stop the server.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_UPLOAD_DIR: &str = "./uploads";
pub const DEFAULT_METADATA_FILE: &str = "./metadata.json";
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
/// 50 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Error building [`AppConfig`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}={value:?} is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Application configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Prefix for viewer links handed back to uploaders; may be empty.
    pub base_url: String,
    /// Artifact store root.
    pub upload_dir: PathBuf,
    /// Persisted registry file.
    pub metadata_file: PathBuf,
    /// Period between sweeper passes.
    pub sweep_interval: Duration,
    /// Request body cap for uploads.
    pub max_upload_bytes: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("base_url", &self.base_url)
            .field("upload_dir", &self.upload_dir.display())
            .field("metadata_file", &self.metadata_file.display())
            .field("sweep_interval_secs", &self.sweep_interval.as_secs())
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            base_url: String::new(),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            metadata_file: PathBuf::from(DEFAULT_METADATA_FILE),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl AppConfig {
    /// Build configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get("PORT") {
            Some(raw) => parse_number("PORT", &raw)?,
            None => defaults.port,
        };
        let sweep_secs: u64 = match get("SWEEP_INTERVAL_SECS") {
            Some(raw) => at_least_one("SWEEP_INTERVAL_SECS", &raw)?,
            None => DEFAULT_SWEEP_INTERVAL_SECS,
        };
        let max_upload_bytes = match get("MAX_UPLOAD_BYTES") {
            Some(raw) => at_least_one("MAX_UPLOAD_BYTES", &raw)?,
            None => defaults.max_upload_bytes,
        };

        Ok(Self {
            port,
            base_url: get("BASE_URL").unwrap_or(defaults.base_url),
            upload_dir: get("UPLOAD_DIR").map(PathBuf::from).unwrap_or(defaults.upload_dir),
            metadata_file: get("METADATA_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.metadata_file),
            sweep_interval: Duration::from_secs(sweep_secs),
            max_upload_bytes,
        })
    }
}

fn parse_number<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn at_least_one<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + From<u8>,
    T::Err: std::fmt::Display,
{
    let value: T = parse_number(var, raw)?;
    if value < T::from(1) {
        return Err(ConfigError::Invalid {
            var,
            value: raw.to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(value)
}
