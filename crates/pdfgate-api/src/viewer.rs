//! # Viewer Page
//!
//! The HTML shell served at `/view/{id}`. It frames `/file/{id}` behind a
//! transparent overlay and blocks the context menu, the save and print
//! shortcuts, and text selection. None of this stops a determined viewer
//! from keeping a copy; it only removes the obvious buttons.
//!
//! The inline script and style are allowed by a per-response CSP nonce.
//! Everything else on the page is restricted to the same origin, and the
//! page itself refuses to be framed.

use axum::http::header::{
    CACHE_CONTROL, CONTENT_SECURITY_POLICY, CONTENT_TYPE, REFERRER_POLICY, X_FRAME_OPTIONS,
};
use axum::response::{IntoResponse, Response};
use rand::rngs::OsRng;
use rand::RngCore;

use pdfgate_core::ArtifactId;

const NONCE_BYTES: usize = 16;

/// A fresh random CSP nonce, hex encoded.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// `Content-Security-Policy` value for a viewer page using `nonce`.
pub fn content_security_policy(nonce: &str) -> String {
    format!(
        "default-src 'self'; script-src 'nonce-{nonce}'; style-src 'nonce-{nonce}'; frame-ancestors 'none'"
    )
}

/// Escape text for use inside HTML element content or a quoted attribute.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

/// Percent-encode a query parameter value.
fn encode_query_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

/// Render the viewer document.
pub fn render_page(id: &ArtifactId, token: &str, nonce: &str) -> String {
    let src = escape_html(&format!("/file/{id}?t={}", encode_query_value(token)));
    let nonce = escape_html(nonce);
    format!(
        concat!(
            "<!doctype html><html><head>",
            "<meta charset=\"utf-8\">",
            "<meta name=\"viewport\" content=\"width=device-width,initial-scale=1\">",
            "<title>Secure PDF</title>",
            "<style nonce=\"{nonce}\">",
            "body{{margin:0;height:100vh}}",
            "iframe{{width:100%;height:100vh;border:0}}",
            "#overlay{{position:fixed;inset:0;z-index:9999}}",
            ".no-select{{user-select:none;-webkit-user-select:none;-ms-user-select:none}}",
            "</style></head>",
            "<body class=\"no-select\">",
            "<div id=\"overlay\"></div>",
            "<iframe src=\"{src}\" allow=\"encrypted-media\"></iframe>",
            "<script nonce=\"{nonce}\">",
            "document.addEventListener('contextmenu',e=>e.preventDefault());",
            "document.addEventListener('keydown',e=>{{",
            "if((e.ctrlKey||e.metaKey)&&['s','p','S','P'].includes(e.key))e.preventDefault();",
            "if(e.key==='PrintScreen')e.preventDefault();",
            "}});",
            "</script></body></html>"
        ),
        nonce = nonce,
        src = src,
    )
}

/// The complete viewer response, headers included.
pub fn viewer_response(id: &ArtifactId, token: &str) -> Response {
    let nonce = generate_nonce();
    (
        [
            (CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
            (CONTENT_SECURITY_POLICY, content_security_policy(&nonce)),
            (X_FRAME_OPTIONS, "DENY".to_string()),
            (CACHE_CONTROL, "no-store".to_string()),
            (REFERRER_POLICY, "no-referrer".to_string()),
        ],
        render_page(id, token, &nonce),
    )
        .into_response()
}
