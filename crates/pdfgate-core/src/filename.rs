//! # Header-Safe File Names
//!
//! The original file name is client input. Before it is placed in a
//! `Content-Disposition` header it is reduced to printable ASCII with quote
//! characters, backslashes and control characters removed, so it cannot
//! terminate the quoted string or inject another header line. Names with
//! non-ASCII characters additionally get an RFC 5987 `filename*` parameter.

/// Name used when nothing printable survives sanitization.
const FALLBACK_NAME: &str = "document.pdf";

/// Reduce an untrusted name to something safe inside `filename="..."`.
pub fn header_filename(original: &str) -> String {
    let cleaned: String = original
        .chars()
        .filter(|c| *c != '"' && *c != '\\' && !c.is_control())
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// An inline `Content-Disposition` value for a stored artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    ascii_name: String,
    utf8_name: Option<String>,
}

impl ContentDisposition {
    /// Build an inline disposition from the untrusted original name.
    pub fn inline(original: &str) -> Self {
        let ascii_name = header_filename(original);
        let stripped: String = original
            .chars()
            .filter(|c| *c != '"' && !c.is_control())
            .collect();
        let utf8_name = (!stripped.is_ascii()).then(|| percent_encode(stripped.trim()));
        Self {
            ascii_name,
            utf8_name,
        }
    }

    /// The sanitized ASCII file name.
    pub fn filename(&self) -> &str {
        &self.ascii_name
    }
}

impl std::fmt::Display for ContentDisposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "inline; filename=\"{}\"", self.ascii_name)?;
        if let Some(encoded) = &self.utf8_name {
            write!(f, "; filename*=UTF-8''{encoded}")?;
        }
        Ok(())
    }
}

/// Percent-encode everything outside the RFC 5987 `attr-char` set.
fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 3);
    for b in s.bytes() {
        let keep = b.is_ascii_alphanumeric()
            || matches!(
                b,
                b'!' | b'#' | b'$' | b'&' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~'
            );
        if keep {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}
