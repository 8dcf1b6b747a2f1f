//! # Integration Tests for pdfgate-api
//!
//! Drives the full router with `tower::ServiceExt::oneshot`: uploads,
//! viewer and file access, uniform denial, lifetime clamping, the PDF type
//! gate, reclamation, CORS, body limits and the OpenAPI document. Time is
//! controlled through a manual clock injected into the vault.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use pdfgate_api::{AppConfig, AppState};
use pdfgate_core::{EpochMillis, ManualClock};
use pdfgate_vault::Vault;

const NOW: i64 = 1_700_000_000_000;
const PDF: &[u8] = b"%PDF-1.4\n1 0 obj << /Type /Catalog >> endobj\n%%EOF\n";
const BOUNDARY: &str = "pdfgate-test-boundary";

struct Harness {
    _dir: tempfile::TempDir,
    uploads: std::path::PathBuf,
    clock: Arc<ManualClock>,
    vault: Vault,
    app: axum::Router,
}

/// Helper: build the app over a fresh temporary store.
fn harness_with(max_upload_bytes: usize) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let uploads = dir.path().join("uploads");
    let metadata = dir.path().join("metadata.json");
    let clock = Arc::new(ManualClock::starting_at(EpochMillis::from_millis(NOW)));
    let vault = Vault::open_with_clock(&uploads, &metadata, clock.clone()).unwrap();
    let config = AppConfig {
        base_url: "https://share.example".to_string(),
        upload_dir: uploads.clone(),
        metadata_file: metadata,
        max_upload_bytes,
        ..AppConfig::default()
    };
    let app = pdfgate_api::app(AppState::new(config, vault.clone()));
    Harness {
        _dir: dir,
        uploads,
        clock,
        vault,
        app,
    }
}

fn harness() -> Harness {
    harness_with(pdfgate_api::config::DEFAULT_MAX_UPLOAD_BYTES)
}

enum Part<'a> {
    File {
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
    /// A `file` part that carries no filename.
    Nameless {
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

/// Helper: encode a multipart/form-data body.
fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File {
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            Part::Nameless {
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"file\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}")
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Helper: read response body as bytes.
async fn body_bytes(response: axum::http::Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

async fn body_string(response: axum::http::Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

async fn body_json(response: axum::http::Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

struct Issued {
    id: String,
    token: String,
    expires_at: i64,
}

/// Helper: upload a PDF and split the viewer link into id and token.
async fn upload_pdf(app: &axum::Router, file_name: &str, minutes: Option<&str>) -> Issued {
    let mut parts = vec![Part::File {
        file_name,
        content_type: "application/pdf",
        bytes: PDF,
    }];
    if let Some(minutes) = minutes {
        parts.push(Part::Text {
            name: "expiresMinutes",
            value: minutes,
        });
    }
    let response = app.clone().oneshot(upload_request(&parts)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    let viewer = json["viewer"].as_str().unwrap();
    let rest = viewer
        .strip_prefix("https://share.example/view/")
        .unwrap_or_else(|| panic!("unexpected viewer link {viewer}"));
    let (id, token) = rest.split_once("?t=").unwrap();
    Issued {
        id: id.to_string(),
        token: token.to_string(),
        expires_at: json["expiresAt"].as_i64().unwrap(),
    }
}

fn upload_dir_entries(h: &Harness) -> usize {
    std::fs::read_dir(&h.uploads).unwrap().count()
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let h = harness();
    let response = h.app.oneshot(get("/health/liveness")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_probe() {
    let h = harness();
    let response = h.app.oneshot(get("/health/readiness")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ready");
}

// -- Upload -------------------------------------------------------------------

#[tokio::test]
async fn test_upload_returns_viewer_link_and_expiry() {
    let h = harness();
    let issued = upload_pdf(&h.app, "report.pdf", Some("5")).await;
    assert_eq!(issued.expires_at, NOW + 5 * 60_000);
    assert_eq!(issued.token.len(), 36);
    assert!(issued.token.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(upload_dir_entries(&h), 1);
}

#[tokio::test]
async fn test_upload_defaults_to_sixty_minutes() {
    let h = harness();
    let missing = upload_pdf(&h.app, "a.pdf", None).await;
    let garbage = upload_pdf(&h.app, "b.pdf", Some("soon")).await;
    assert_eq!(missing.expires_at, NOW + 60 * 60_000);
    assert_eq!(garbage.expires_at, NOW + 60 * 60_000);
}

#[tokio::test]
async fn test_upload_clamps_short_lifetimes_to_one_minute() {
    let h = harness();
    for minutes in ["0", "-5"] {
        let issued = upload_pdf(&h.app, "a.pdf", Some(minutes)).await;
        assert_eq!(issued.expires_at, NOW + 60_000, "expiresMinutes={minutes}");
    }
}

#[tokio::test]
async fn test_upload_rejects_non_pdf_without_storing() {
    let h = harness();
    let response = h
        .app
        .clone()
        .oneshot(upload_request(&[Part::File {
            file_name: "cat.png",
            content_type: "image/png",
            bytes: b"\x89PNG",
        }]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({"error": "Only PDF allowed"})
    );
    assert_eq!(upload_dir_entries(&h), 0);
    assert!(h.vault.registry().is_empty());
}

#[tokio::test]
async fn test_upload_without_file_part() {
    let h = harness();
    let response = h
        .app
        .clone()
        .oneshot(upload_request(&[Part::Text {
            name: "expiresMinutes",
            value: "5",
        }]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({"error": "No file uploaded"})
    );
}

#[tokio::test]
async fn test_upload_file_field_without_filename_is_not_a_file() {
    let h = harness();
    let response = h
        .app
        .clone()
        .oneshot(upload_request(&[Part::Nameless {
            content_type: "application/pdf",
            bytes: PDF,
        }]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({"error": "No file uploaded"})
    );
    assert_eq!(upload_dir_entries(&h), 0);
    assert!(h.vault.registry().is_empty());
}

#[tokio::test]
async fn test_upload_without_multipart_body() {
    let h = harness();
    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({"error": "No file uploaded"})
    );
}

#[tokio::test]
async fn test_upload_over_body_limit_is_413() {
    let h = harness_with(1024);
    let big = vec![b'x'; 8 * 1024];
    let response = h
        .app
        .clone()
        .oneshot(upload_request(&[Part::File {
            file_name: "big.pdf",
            content_type: "application/pdf",
            bytes: &big,
        }]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(h.vault.registry().is_empty());
}

// -- View and File ------------------------------------------------------------

#[tokio::test]
async fn test_file_round_trip_is_byte_identical() {
    let h = harness();
    let issued = upload_pdf(&h.app, "report.pdf", None).await;

    let response = h
        .app
        .oneshot(get(&format!("/file/{}?t={}", issued.id, issued.token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers().clone();
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "inline; filename=\"report.pdf\""
    );
    assert_eq!(headers[header::CACHE_CONTROL], "no-store");
    assert_eq!(headers[header::CONTENT_LENGTH], PDF.len().to_string().as_str());
    assert_eq!(body_bytes(response).await, PDF);
}

#[tokio::test]
async fn test_file_header_name_is_ascii_with_utf8_variant() {
    let h = harness();
    let issued = upload_pdf(&h.app, "résumé.pdf", None).await;
    let response = h
        .app
        .oneshot(get(&format!("/file/{}?t={}", issued.id, issued.token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "inline; filename=\"r_sum_.pdf\"; filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"
    );
}

#[tokio::test]
async fn test_view_serves_hardened_viewer() {
    let h = harness();
    let issued = upload_pdf(&h.app, "report.pdf", None).await;

    let response = h
        .app
        .oneshot(get(&format!("/view/{}?t={}", issued.id, issued.token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let csp = response.headers()[header::CONTENT_SECURITY_POLICY]
        .to_str()
        .unwrap()
        .to_string();
    assert!(csp.contains("frame-ancestors 'none'"));
    assert!(csp.contains("script-src 'nonce-"));
    assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "DENY");
    assert_eq!(response.headers()[header::REFERRER_POLICY], "no-referrer");

    let html = body_string(response).await;
    assert!(html.contains(&format!(
        "<iframe src=\"/file/{}?t={}\"",
        issued.id, issued.token
    )));
}

#[tokio::test]
async fn test_denials_are_indistinguishable() {
    let h = harness();
    let issued = upload_pdf(&h.app, "a.pdf", Some("1")).await;
    let other = upload_pdf(&h.app, "b.pdf", Some("1")).await;
    let unknown = pdfgate_core::ArtifactId::new();

    let mut uris = Vec::new();
    for route in ["view", "file"] {
        uris.push(format!("/{route}/{}?t=deadbeef", issued.id));
        uris.push(format!("/{route}/{}?t={}", issued.id, other.token));
        uris.push(format!("/{route}/{}", issued.id));
        uris.push(format!("/{route}/{unknown}?t={}", issued.token));
        uris.push(format!("/{route}/not-a-uuid?t={}", issued.token));
        uris.push(format!("/{route}/%FF%FE?t={}", issued.token));
    }

    for uri in &uris {
        let response = h.app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body_string(response).await, "Not found or expired", "{uri}");
    }

    // Expired links answer the same way.
    h.clock.advance(60_001);
    for route in ["view", "file"] {
        let uri = format!("/{route}/{}?t={}", other.id, other.token);
        let response = h.app.clone().oneshot(get(&uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body_string(response).await, "Not found or expired", "{uri}");
    }
}

#[tokio::test]
async fn test_link_is_valid_until_expiry_inclusive() {
    let h = harness();
    let issued = upload_pdf(&h.app, "a.pdf", Some("1")).await;
    let uri = format!("/file/{}?t={}", issued.id, issued.token);

    h.clock.set(EpochMillis::from_millis(issued.expires_at));
    let response = h.app.clone().oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    h.clock.set(EpochMillis::from_millis(issued.expires_at + 1));
    let response = h.app.clone().oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_bytes_are_a_uniform_denial() {
    let h = harness();
    let issued = upload_pdf(&h.app, "a.pdf", None).await;
    std::fs::remove_file(h.uploads.join(format!("{}.pdf", issued.id))).unwrap();

    let response = h
        .app
        .oneshot(get(&format!("/file/{}?t={}", issued.id, issued.token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(response).await, "Not found or expired");
}

// -- Reclamation --------------------------------------------------------------

#[tokio::test]
async fn test_sweep_removes_expired_link_completely() {
    let h = harness();
    let expired = upload_pdf(&h.app, "a.pdf", Some("1")).await;
    let live = upload_pdf(&h.app, "b.pdf", Some("10")).await;

    h.clock.advance(2 * 60_000);
    let report = h.vault.sweep_once().unwrap();
    assert_eq!(report.expired, 1);

    assert!(!h.uploads.join(format!("{}.pdf", expired.id)).exists());
    assert!(h.uploads.join(format!("{}.pdf", live.id)).exists());

    let response = h
        .app
        .clone()
        .oneshot(get(&format!("/file/{}?t={}", expired.id, expired.token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(response).await, "Not found or expired");

    let response = h
        .app
        .oneshot(get(&format!("/file/{}?t={}", live.id, live.token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_expired_access_reclaims_in_background() {
    let h = harness();
    let issued = upload_pdf(&h.app, "a.pdf", Some("1")).await;
    let id = pdfgate_core::ArtifactId::parse(&issued.id).unwrap();
    let stored = h.uploads.join(format!("{}.pdf", issued.id));

    h.clock.advance(2 * 60_000);
    let response = h
        .app
        .clone()
        .oneshot(get(&format!("/view/{}?t={}", issued.id, issued.token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    while h.vault.registry().get(&id).is_some() || stored.exists() {
        assert!(
            std::time::Instant::now() < deadline,
            "expired link was not reclaimed"
        );
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}

// -- Ranges -------------------------------------------------------------------

#[tokio::test]
async fn test_file_serves_single_byte_range() {
    let h = harness();
    let issued = upload_pdf(&h.app, "a.pdf", None).await;
    let request = Request::builder()
        .uri(format!("/file/{}?t={}", issued.id, issued.token))
        .header(header::RANGE, "bytes=0-7")
        .body(Body::empty())
        .unwrap();
    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.headers()[header::CONTENT_RANGE],
        format!("bytes 0-7/{}", PDF.len()).as_str()
    );
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "8");
    assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");
    assert_eq!(body_bytes(response).await, &PDF[..8]);
}

#[tokio::test]
async fn test_file_range_past_end_is_416() {
    let h = harness();
    let issued = upload_pdf(&h.app, "a.pdf", None).await;
    let request = Request::builder()
        .uri(format!("/file/{}?t={}", issued.id, issued.token))
        .header(header::RANGE, format!("bytes={}-", PDF.len()))
        .body(Body::empty())
        .unwrap();
    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(
        response.headers()[header::CONTENT_RANGE],
        format!("bytes */{}", PDF.len()).as_str()
    );
}

#[tokio::test]
async fn test_range_does_not_bypass_the_guard() {
    let h = harness();
    let issued = upload_pdf(&h.app, "a.pdf", None).await;
    let request = Request::builder()
        .uri(format!("/file/{}?t=deadbeef", issued.id))
        .header(header::RANGE, "bytes=0-7")
        .body(Body::empty())
        .unwrap();
    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(response).await, "Not found or expired");
}

// -- CORS ---------------------------------------------------------------------

#[tokio::test]
async fn test_bare_options_request_is_ok() {
    let h = harness();
    for uri in ["/upload", "/view/anything", "/file/anything"] {
        let request = Request::builder()
            .method("OPTIONS")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = h.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }

    let request = Request::builder()
        .method("DELETE")
        .uri("/upload")
        .body(Body::empty())
        .unwrap();
    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_cors_preflight_allows_any_origin() {
    let h = harness();
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/upload")
        .header(header::ORIGIN, "https://elsewhere.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();
    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
    let methods = response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS]
        .to_str()
        .unwrap()
        .to_string();
    assert!(methods.contains("POST"));
}

// -- OpenAPI ------------------------------------------------------------------

#[tokio::test]
async fn test_openapi_document_is_served() {
    let h = harness();
    let response = h.app.oneshot(get("/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["paths"]["/upload"].is_object());
    assert!(json["paths"]["/view/{id}"].is_object());
    assert!(json["paths"]["/file/{id}"].is_object());
}
