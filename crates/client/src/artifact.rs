//! Downloadable artifacts (mask files, machine code) and the helpers used
//! to resolve them from store responses.
//!
//! The store answers a generation request either with the file itself or
//! with a small JSON document pointing at it. A `Content-Disposition`
//! header, when present, overrides the default file name.

/// A downloaded file.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// JSON keys checked, in order, for a pointer to the real file.
pub const POINTER_KEYS: [&str; 3] = ["path", "file", "url"];

/// Whether a `Content-Type` value denotes a JSON document.
pub fn is_json(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.contains("application/json"))
}

/// First non-empty string among `path`, `file`, `url`.
pub fn pointer_from_json(value: &serde_json::Value) -> Option<&str> {
    POINTER_KEYS
        .iter()
        .filter_map(|key| value.get(key).and_then(serde_json::Value::as_str))
        .find(|s| !s.is_empty())
}

/// File name from a `Content-Disposition` header value.
///
/// Takes everything after the first `filename=`, up to an optional `;`,
/// with quotes removed.
pub fn filename_from_content_disposition(value: &str) -> Option<String> {
    let (_, rest) = value.split_once("filename=")?;
    let raw = rest.split(';').next().unwrap_or_default();
    let name: String = raw.chars().filter(|c| !matches!(c, '"' | '\'')).collect();
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
