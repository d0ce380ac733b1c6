//! Request-level failures.
//!
//! Every way a request can be turned away maps to exactly one HTTP status.
//! None of these are fatal to the connection; they become an error response.

use std::fmt;

use crate::http::response::StatusCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// The request line or headers could not be decoded.
    MalformedRequest,
    /// Anything other than `GET`.
    UnsupportedMethod,
    /// Traversal pattern, forbidden character or escape from the root.
    UnsafePath,
    /// The target does not exist or is hidden.
    MissingOrHidden,
    /// The target exists but is neither a directory nor a regular file.
    NotRegularFile,
    /// The file disappeared (or became unreadable) between lookup and open.
    FileOpenRace,
}

impl Failure {
    pub fn status(&self) -> StatusCode {
        match self {
            Failure::MalformedRequest => StatusCode::BadRequest,
            Failure::UnsupportedMethod => StatusCode::MethodNotAllowed,
            Failure::UnsafePath | Failure::NotRegularFile => StatusCode::Forbidden,
            Failure::MissingOrHidden | Failure::FileOpenRace => StatusCode::NotFound,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            Failure::MalformedRequest => "malformed request",
            Failure::UnsupportedMethod => "unsupported method",
            Failure::UnsafePath => "unsafe path",
            Failure::MissingOrHidden => "missing or hidden target",
            Failure::NotRegularFile => "not a regular file",
            Failure::FileOpenRace => "file could not be opened",
        };
        f.write_str(what)
    }
}

impl std::error::Error for Failure {}
