//! Request-path validation.
//!
//! Runs before the filesystem is touched. A path that passes is safe to join
//! onto the server root: it holds no `.`-prefixed segment (so no `..`), does
//! not start or end with a dot and carries none of the characters that could
//! break out of the HTML listing.

use std::path::{MAIN_SEPARATOR, PathBuf};

use crate::error::Failure;
use crate::http::request::{Method, Request};

/// Characters never allowed in a request path.
pub const INSECURE_CHARS: [char; 4] = ['<', '>', '&', '"'];

/// A request path that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafePath {
    /// Path relative to the server root, using the platform separator.
    pub relative: PathBuf,
    /// The decoded request path as the client sees it (`/`-separated).
    pub display: String,
}

/// Checks the request as a whole: decoding, method, then path.
pub fn validate(req: &Request) -> Result<SafePath, Failure> {
    if !req.decoded {
        return Err(Failure::MalformedRequest);
    }
    if req.method != Method::GET {
        return Err(Failure::UnsupportedMethod);
    }
    check_uri(&req.path)
}

/// Decodes and checks a raw request target.
pub fn check_uri(uri: &str) -> Result<SafePath, Failure> {
    let target = strip_query(origin_form(uri));

    let decoded = urlencoding::decode(target).map_err(|_| Failure::MalformedRequest)?;
    if decoded.is_empty() || decoded.contains('\0') {
        return Err(Failure::UnsafePath);
    }

    let local: String = decoded
        .chars()
        .map(|c| if c == '/' { MAIN_SEPARATOR } else { c })
        .collect();

    if is_unsafe(&local) {
        return Err(Failure::UnsafePath);
    }

    Ok(SafePath {
        relative: PathBuf::from(local.trim_start_matches(MAIN_SEPARATOR)),
        display: decoded.into_owned(),
    })
}

fn is_unsafe(local: &str) -> bool {
    let sep_dot = format!("{MAIN_SEPARATOR}.");
    let dot_sep = format!(".{MAIN_SEPARATOR}");

    local.contains(&sep_dot)
        || local.contains(&dot_sep)
        || local.starts_with('.')
        || local.ends_with('.')
        || local.contains(INSECURE_CHARS)
}

/// Reduces an absolute-form target (`http://host/path`) to its path.
fn origin_form(uri: &str) -> &str {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return uri;
    };
    if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
        return uri;
    }
    match rest.find('/') {
        Some(start) => &rest[start..],
        None => "/",
    }
}

fn strip_query(uri: &str) -> &str {
    match uri.find(['?', '#']) {
        Some(end) => &uri[..end],
        None => uri,
    }
}
