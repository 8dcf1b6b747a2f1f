//! # Upload Route
//!
//! `POST /upload` accepts `multipart/form-data` with a `file` part and an
//! optional `expiresMinutes` text part. Unknown parts are ignored, as is
//! any `file` part after the first.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use pdfgate_vault::{IssueError, Upload};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::state::AppState;

const FILE_FIELD: &str = "file";
const MINUTES_FIELD: &str = "expiresMinutes";

/// Multipart form accepted by `POST /upload`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UploadForm {
    /// The PDF document. Its declared content type must contain `pdf`.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Link lifetime in minutes. Defaults to 60; values below 1 become 1.
    #[serde(rename = "expiresMinutes")]
    pub expires_minutes: Option<String>,
}

/// Successful upload response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Viewer link carrying the access token.
    pub viewer: String,
    /// Expiry as milliseconds since the UNIX epoch.
    pub expires_at: i64,
}

/// Build the upload router with the configured body cap.
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// POST /upload — Store a PDF and return its viewer link.
#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Link issued", body = UploadResponse),
        (status = 400, description = "No file, not a PDF, or malformed form", body = crate::error::ErrorBody),
        (status = 413, description = "Upload exceeds the size cap", body = crate::error::ErrorBody),
        (status = 500, description = "Storage failure", body = crate::error::ErrorBody),
    ),
    tag = "sharing"
)]
pub(crate) async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!(error = %rejection, "upload request is not multipart");
        AppError::from(IssueError::MissingPayload)
    })?;
    let upload = read_upload(&mut multipart).await?;

    let vault = state.vault.clone();
    let config = state.config.clone();
    let link = tokio::task::spawn_blocking(move || vault.issue(upload, &config.base_url)).await??;

    Ok(Json(UploadResponse {
        viewer: link.viewer,
        expires_at: link.expires_at.as_millis(),
    }))
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, AppError> {
    let mut upload = Upload::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            // A `file` part without a filename is a plain text field.
            Some(FILE_FIELD) if upload.bytes.is_none() && field.file_name().is_some() => {
                upload.content_type = field.content_type().unwrap_or_default().to_string();
                upload.original_name = field.file_name().unwrap_or_default().to_string();
                upload.bytes = Some(field.bytes().await?.to_vec());
            }
            Some(MINUTES_FIELD) => {
                upload.requested_minutes = Some(field.text().await?);
            }
            _ => {}
        }
    }
    Ok(upload)
}
