//! # Temporal Types — Epoch Milliseconds and Link Lifetimes
//!
//! Expiry is an absolute instant in milliseconds since the UNIX epoch,
//! stored as a bare JSON number so the persisted registry stays readable
//! by anything that understands `Date.now()`-style timestamps.
//!
//! ## Lifetime Clamping
//!
//! A requested lifetime is parsed leniently: the leading integer of the
//! input is used, non-numeric input falls back to
//! [`Lifetime::DEFAULT_MINUTES`], and anything below one minute is raised
//! to one minute. A link is therefore always strictly in the future when
//! it is issued.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Milliseconds since the UNIX epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpochMillis(i64);

impl EpochMillis {
    /// Wrap a raw millisecond count.
    pub const fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    /// The raw millisecond count.
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Shift forward by a lifetime, saturating at the end of representable time.
    pub fn plus(&self, lifetime: Lifetime) -> Self {
        Self(self.0.saturating_add(lifetime.as_millis()))
    }

    /// Shift by a signed number of milliseconds, saturating.
    pub fn offset(&self, ms: i64) -> Self {
        Self(self.0.saturating_add(ms))
    }

    /// Convert to a `chrono` timestamp for display, if in range.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.0)
    }
}

impl std::fmt::Display for EpochMillis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.3fZ")),
            None => write!(f, "{}ms", self.0),
        }
    }
}

/// Abstraction over the time source.
///
/// Production code injects [`SystemClock`]; tests inject a clock they can
/// move forward to cross expiry boundaries deterministically.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current wall-clock time.
    fn now(&self) -> EpochMillis;
}

/// Wall-clock time from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> EpochMillis {
        EpochMillis(Utc::now().timestamp_millis())
    }
}

/// A clock that only moves when told to.
///
/// Used by tests and simulations to step across expiry boundaries.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Start the clock at `start`.
    pub fn starting_at(start: EpochMillis) -> Self {
        Self {
            now: AtomicI64::new(start.0),
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, to: EpochMillis) {
        self.now.store(to.0, Ordering::SeqCst);
    }

    /// Move forward by `ms` milliseconds.
    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> EpochMillis {
        EpochMillis(self.now.load(Ordering::SeqCst))
    }
}

/// Effective lifetime of a viewing link, in whole minutes (always >= 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Lifetime(i64);

impl Lifetime {
    /// Lifetime used when the request omits or garbles the value.
    pub const DEFAULT_MINUTES: i64 = 60;

    /// Shortest lifetime a link can be issued with.
    pub const MIN_MINUTES: i64 = 1;

    const MILLIS_PER_MINUTE: i64 = 60 * 1000;

    /// Build a lifetime from a minute count, clamping to the minimum.
    pub fn from_minutes(minutes: i64) -> Self {
        Self(minutes.max(Self::MIN_MINUTES))
    }

    /// Derive the lifetime from the raw `expiresMinutes` form value.
    pub fn from_request(raw: Option<&str>) -> Self {
        let minutes = raw
            .and_then(parse_leading_int)
            .unwrap_or(Self::DEFAULT_MINUTES);
        Self::from_minutes(minutes)
    }

    /// Whole minutes.
    pub fn minutes(&self) -> i64 {
        self.0
    }

    /// Length in milliseconds, saturating.
    pub fn as_millis(&self) -> i64 {
        self.0.saturating_mul(Self::MILLIS_PER_MINUTE)
    }
}

impl Default for Lifetime {
    fn default() -> Self {
        Self(Self::DEFAULT_MINUTES)
    }
}

/// Parse the leading base-10 integer of `s`.
///
/// Leading whitespace and one sign character are accepted; parsing stops at
/// the first non-digit. Returns `None` when no digit is found. Magnitudes
/// beyond `i64` saturate.
fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i64 = 0;
    let mut seen = false;
    for b in digits.bytes() {
        if !b.is_ascii_digit() {
            break;
        }
        seen = true;
        value = value
            .saturating_mul(10)
            .saturating_add(i64::from(b - b'0'));
    }

    if !seen {
        return None;
    }
    Some(if negative { -value } else { value })
}
