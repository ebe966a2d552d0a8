//! Upload content-type handling.
//!
//! The upload allowlist here is deliberately narrower than the set of types
//! the text extractor understands; the two are maintained separately.

use crate::defaults;

/// Content types accepted at the upload boundary.
pub const UPLOAD_ALLOWED_TYPES: &[&str] =
    &["application/pdf", "text/plain", "image/png", "image/jpeg"];

/// Strip parameters (`; charset=...`) and normalise case.
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Whether an upload with this content type is accepted.
pub fn is_upload_allowed(content_type: &str) -> bool {
    let essence = essence(content_type);
    UPLOAD_ALLOWED_TYPES.contains(&essence.as_str())
}

/// Decide the content type to record for an upload.
///
/// A non-empty claimed type wins. Otherwise magic bytes are sniffed, falling
/// back to `application/octet-stream`.
pub fn resolve_content_type(claimed: Option<&str>, data: &[u8]) -> String {
    if let Some(claimed) = claimed.map(essence).filter(|c| !c.is_empty()) {
        return claimed;
    }
    match infer::get(data) {
        Some(kind) => kind.mime_type().to_string(),
        None => defaults::FALLBACK_CONTENT_TYPE.to_string(),
    }
}

/// Lowercase alphanumeric extension of `filename`, if it has a usable one.
pub fn file_extension(filename: &str) -> Option<String> {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    let ext: String = ext
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if ext.is_empty() || ext.len() > defaults::STORAGE_KEY_EXT_MAX_LEN {
        return None;
    }
    Some(ext)
}
