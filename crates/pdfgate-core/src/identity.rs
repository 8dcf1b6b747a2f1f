//! # Capability Identifiers
//!
//! An uploaded document is addressed by an [`ArtifactId`] and unlocked by an
//! [`AccessToken`]. Both are drawn from the OS random source at upload time.
//!
//! ## Security Invariant
//!
//! Knowing the identifier is not enough: a request must also present the
//! token, and the token check runs in constant time so response latency
//! does not reveal how many leading characters of a guess were right.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Number of random bytes behind an access token (144 bits).
pub const TOKEN_BYTES: usize = 18;

/// Unique identifier for an uploaded artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(Uuid);

impl ArtifactId {
    /// Generate a new random artifact identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identifier taken from a request path.
    ///
    /// Returns `None` for anything that is not a UUID. Callers treat that
    /// exactly like an unknown identifier.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Secret that must accompany an [`ArtifactId`] to view the artifact.
///
/// Custom `Debug` redacts the value to prevent credential leakage in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Draw a fresh token from the OS random source.
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex_encode(&bytes))
    }

    /// Wrap an already-issued token value (e.g. loaded from the registry).
    pub fn from_issued(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The token as it appears in viewer links.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant-time comparison against a token supplied by a client.
    ///
    /// When lengths differ a dummy comparison still runs, so a mismatch in
    /// length takes as long as a mismatch in content.
    pub fn verify(&self, provided: &str) -> bool {
        let expected = self.0.as_bytes();
        let provided = provided.as_bytes();
        if provided.len() != expected.len() {
            let _ = expected.ct_eq(expected);
            return false;
        }
        provided.ct_eq(expected).into()
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// Encode bytes as lowercase hex.
fn hex_encode(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(DIGITS[(b >> 4) as usize] as char);
        out.push(DIGITS[(b & 0x0f) as usize] as char);
    }
    out
}
