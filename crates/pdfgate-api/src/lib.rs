//! # pdfgate-api — HTTP Surface for pdfgate
//!
//! Axum router over the vault: uploads issue time-limited viewer links,
//! and the view and file routes admit only the matching token before the
//! link expires.
//!
//! ## API Surface
//!
//! | Route | Module | Purpose |
//! |-------|--------|---------|
//! | `POST /upload` | [`routes::upload`] | store a PDF, return `{viewer, expiresAt}` |
//! | `GET /view/{id}?t=` | [`routes::access`] | viewer page |
//! | `GET /file/{id}?t=` | [`routes::access`] | PDF bytes |
//! | `GET /health/*` | this module | liveness and readiness probes |
//! | `GET /openapi.json` | [`openapi`] | generated OpenAPI document |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → CorsLayer → Handler
//! ```
//!
//! Cross-origin requests are permitted from any origin; links are meant to
//! be shared, and the token in the URL is the only credential.

pub mod config;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod sweeper;
pub mod viewer;

use axum::extract::State;
use axum::http::{header, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::{AppConfig, ConfigError};
pub use error::AppError;
pub use state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .merge(routes::upload::router(state.config.max_upload_bytes))
        .merge(routes::access::router())
        .merge(openapi::router())
        .method_not_allowed_fallback(method_not_allowed)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Answer a bare `OPTIONS` on any route with 200; other unrouted methods
/// stay 405. Preflights never get here, the CORS layer answers them.
async fn method_not_allowed(method: Method) -> StatusCode {
    if method == Method::OPTIONS {
        StatusCode::OK
    } else {
        StatusCode::METHOD_NOT_ALLOWED
    }
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe. Checks that the artifact directory is still reachable.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if !state.vault.artifacts().base_dir().is_dir() {
        tracing::warn!("upload directory is missing");
        return (StatusCode::SERVICE_UNAVAILABLE, "upload directory missing").into_response();
    }
    (StatusCode::OK, "ready").into_response()
}
