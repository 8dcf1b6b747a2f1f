//! # pdfgate-core — Foundational Types for pdfgate
//!
//! Domain primitives shared by the vault and the HTTP surface. Nothing in
//! this crate touches the filesystem or the network.
//!
//! ## Key Design Principles
//!
//! 1. **Newtypes for capabilities.** `ArtifactId` and `AccessToken` are
//!    distinct types; a token can never be passed where an identifier is
//!    expected, and token comparison is only available in constant time.
//!
//! 2. **Injected time.** Every expiry decision takes an [`EpochMillis`]
//!    obtained from a [`Clock`], never from an ambient `now()` call.
//!
//! 3. **Untrusted names stay quarantined.** The client-supplied file name
//!    only reaches disk through [`stored_name_for`] (extension only) and only
//!    reaches headers through [`header_filename`].
//!
//! ## Crate Policy
//!
//! - No dependencies on other `pdfgate-*` crates (leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod filename;
pub mod identity;
pub mod record;
pub mod temporal;

pub use filename::{header_filename, ContentDisposition};
pub use identity::{AccessToken, ArtifactId};
pub use record::{stored_name_for, AccessRecord, DEFAULT_EXTENSION};
pub use temporal::{Clock, EpochMillis, Lifetime, ManualClock, SystemClock};
