//! # Access Routes
//!
//! `GET /view/{id}?t={token}` serves the viewer page and
//! `GET /file/{id}?t={token}` streams the document, honouring a single
//! `Range`. Both go through the vault's guard first.
//!
//! Every refusal, including an id or query string the extractors cannot
//! parse, becomes the same plain-text 404. The distinct causes only show up
//! in the logs.

use axum::body::Body;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use std::io::SeekFrom;

use axum::http::header::{
    ACCEPT_RANGES, CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_RANGE,
    CONTENT_SECURITY_POLICY, CONTENT_TYPE, RANGE, X_CONTENT_TYPE_OPTIONS,
};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use pdfgate_core::{ArtifactId, ContentDisposition};
use pdfgate_vault::AccessError;
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use utoipa::IntoParams;

use crate::error::AppError;
use crate::state::AppState;
use crate::viewer;

/// Query string carrying the access token.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AccessQuery {
    /// Access token issued with the link.
    pub t: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/view/{id}", get(view))
        .route("/file/{id}", get(file))
}

/// Resolve the path id and token; anything unparseable becomes empty.
fn capability(
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<AccessQuery>, QueryRejection>,
) -> (String, String) {
    let id = path.map(|Path(id)| id).unwrap_or_default();
    let token = query.ok().and_then(|Query(q)| q.t).unwrap_or_default();
    (id, token)
}

/// Log a refusal, schedule cleanup for expired records, and map to the
/// uniform denial.
fn deny(state: &AppState, route: &'static str, id: &str, err: AccessError) -> AppError {
    match err {
        AccessError::NotFound => {
            tracing::debug!(route, "access refused");
        }
        AccessError::Expired => {
            tracing::debug!(route, id, "access to expired capability");
            if let Some(id) = ArtifactId::parse(id) {
                let vault = state.vault.clone();
                tokio::task::spawn_blocking(move || {
                    if let Err(e) = vault.reclaim_expired(&id) {
                        tracing::warn!(%id, error = %e, "lazy reclamation failed");
                    }
                });
            }
        }
        AccessError::FileMissing => {
            tracing::error!(route, id, "live capability has no artifact bytes");
        }
    }
    AppError::Denied(err)
}

/// GET /view/{id} — Viewer page for a shared document.
#[utoipa::path(
    get,
    path = "/view/{id}",
    params(
        ("id" = String, Path, description = "Artifact identifier"),
        AccessQuery,
    ),
    responses(
        (status = 200, description = "Viewer page", body = String, content_type = "text/html"),
        (status = 404, description = "Not found or expired", body = String, content_type = "text/plain"),
    ),
    tag = "sharing"
)]
pub(crate) async fn view(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<AccessQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let (id, token) = capability(path, query);
    let record = state
        .vault
        .authorize(&id, &token)
        .map_err(|e| deny(&state, "view", &id, e))?;
    Ok(viewer::viewer_response(&record.id, &token))
}

/// Byte range selected by a `Range` request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteRange {
    /// No usable range; serve the whole document.
    Full,
    /// Serve bytes `start..=end`.
    Partial { start: u64, end: u64 },
    /// The range starts past the end of the document.
    Unsatisfiable,
}

/// Resolve a `Range` header against a document of `len` bytes.
///
/// Only a single `bytes=` range is honoured. Multiple ranges and
/// malformed headers fall back to the whole document.
fn byte_range(header: Option<&str>, len: u64) -> ByteRange {
    let Some(spec) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return ByteRange::Full;
    };
    if spec.contains(',') {
        return ByteRange::Full;
    }
    let Some((first, last)) = spec.split_once('-') else {
        return ByteRange::Full;
    };
    let (first, last) = (first.trim(), last.trim());

    if first.is_empty() {
        // Suffix form: the final `last` bytes.
        let Ok(suffix) = last.parse::<u64>() else {
            return ByteRange::Full;
        };
        if suffix == 0 || len == 0 {
            return ByteRange::Unsatisfiable;
        }
        return ByteRange::Partial {
            start: len.saturating_sub(suffix),
            end: len - 1,
        };
    }

    let Ok(start) = first.parse::<u64>() else {
        return ByteRange::Full;
    };
    let end = if last.is_empty() {
        u64::MAX
    } else {
        match last.parse::<u64>() {
            Ok(end) if end >= start => end,
            _ => return ByteRange::Full,
        }
    };
    if start >= len {
        return ByteRange::Unsatisfiable;
    }
    ByteRange::Partial {
        start,
        end: end.min(len - 1),
    }
}

/// Denial for a grant whose bytes could not be opened.
fn vanished(state: &AppState, id: &str, token: &str) -> AppError {
    deny(state, "file", id, state.vault.classify_missing(id, token))
}

/// GET /file/{id} — Raw PDF bytes.
#[utoipa::path(
    get,
    path = "/file/{id}",
    params(
        ("id" = String, Path, description = "Artifact identifier"),
        AccessQuery,
    ),
    responses(
        (status = 200, description = "The document, served as application/pdf"),
        (status = 206, description = "The requested byte range of the document"),
        (status = 404, description = "Not found or expired", body = String, content_type = "text/plain"),
        (status = 416, description = "Requested range lies past the end of the document"),
    ),
    tag = "sharing"
)]
pub(crate) async fn file(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<AccessQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let (id, token) = capability(path, query);
    let grant = state
        .vault
        .open_artifact(&id, &token)
        .map_err(|e| deny(&state, "file", &id, e))?;

    // The sweeper may have removed the bytes since the guard looked.
    let mut file = match tokio::fs::File::open(&grant.path).await {
        Ok(file) => file,
        Err(e) => {
            tracing::debug!(id = %grant.record.id, error = %e, "artifact vanished before open");
            return Err(vanished(&state, &id, &token));
        }
    };
    let length = file.metadata().await.ok().map(|m| m.len());
    let range = match length {
        Some(len) => byte_range(
            headers.get(RANGE).and_then(|v| v.to_str().ok()),
            len,
        ),
        None => ByteRange::Full,
    };

    if let (ByteRange::Unsatisfiable, Some(len)) = (range, length) {
        return Response::builder()
            .status(StatusCode::RANGE_NOT_SATISFIABLE)
            .header(CONTENT_RANGE, format!("bytes */{len}"))
            .header(CACHE_CONTROL, "no-store")
            .body(Body::empty())
            .map_err(|e| AppError::Internal(format!("failed to build file response: {e}")));
    }

    let disposition = ContentDisposition::inline(&grant.record.original_name);
    let mut builder = Response::builder()
        .header(CONTENT_TYPE, "application/pdf")
        .header(CONTENT_DISPOSITION, disposition.to_string())
        .header(CACHE_CONTROL, "no-store")
        .header(CONTENT_SECURITY_POLICY, "frame-ancestors 'self'")
        .header(X_CONTENT_TYPE_OPTIONS, "nosniff")
        .header(ACCEPT_RANGES, "bytes");

    let body = match (range, length) {
        (ByteRange::Partial { start, end }, Some(len)) => {
            file.seek(SeekFrom::Start(start))
                .await
                .map_err(|e| AppError::Internal(format!("failed to seek artifact: {e}")))?;
            let count = end - start + 1;
            builder = builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(CONTENT_RANGE, format!("bytes {start}-{end}/{len}"))
                .header(CONTENT_LENGTH, count);
            Body::from_stream(ReaderStream::new(file.take(count)))
        }
        _ => {
            builder = builder.status(StatusCode::OK);
            if let Some(len) = length {
                builder = builder.header(CONTENT_LENGTH, len);
            }
            Body::from_stream(ReaderStream::new(file))
        }
    };

    builder
        .body(body)
        .map_err(|e| AppError::Internal(format!("failed to build file response: {e}")))
}
