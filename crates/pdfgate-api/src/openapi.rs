//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into one OpenAPI document served
//! at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "pdfgate",
        description = "Share PDF documents through time-limited, token-gated viewer links.\n\nUploads return a viewer link that embeds an unguessable access token. Every refused view or download answers with the same `404 Not found or expired`, whatever the cause."
    ),
    paths(
        crate::routes::upload::upload,
        crate::routes::access::view,
        crate::routes::access::file,
    ),
    components(
        schemas(
            crate::error::ErrorBody,
            crate::routes::upload::UploadForm,
            crate::routes::upload::UploadResponse,
        )
    ),
    tags(
        (name = "sharing", description = "Upload and token-gated access"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
