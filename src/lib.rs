//! dirserve - static file and directory listing server
//!
//! Serves one directory tree over HTTP/1.x: files stream out (zero-copy on
//! plain TCP), directories render as HTML listings, and every request path
//! is validated before it touches the filesystem.

pub mod config;
pub mod error;
pub mod fs;
pub mod http;
pub mod server;
