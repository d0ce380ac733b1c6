//! Content-Type lookup by file name.
//!
//! Backed by the static extension tables in `mime_guess`, so the lookup is
//! shared by every connection without any initialization or locking.

use std::path::Path;

/// Returned when the extension is missing or unknown.
pub const FALLBACK: &str = "application/octet-stream";

pub fn content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| FALLBACK.to_string())
}
