//! # API Route Modules
//!
//! - `upload`: `POST /upload`, store a PDF and issue a viewer link.
//! - `access`: `GET /view/{id}` and `GET /file/{id}`, the token-gated viewer
//!   page and raw bytes.

pub mod access;
pub mod upload;
