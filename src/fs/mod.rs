//! Everything that decides what a request path refers to on disk.
//!
//! - **`validate`**: rejects unsafe request paths before any filesystem access
//! - **`resolve`**: maps a validated path under the root and classifies it
//! - **`listing`**: renders a directory as HTML

pub mod listing;
pub mod resolve;
pub mod validate;

use std::fs::Metadata;
use std::path::Path;

pub use listing::render_listing;
pub use resolve::{ResolvedTarget, Resolver};
pub use validate::{SafePath, validate};

/// Dot-files are hidden on Unix.
#[cfg(not(windows))]
pub fn is_hidden(path: &Path, _meta: &Metadata) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// Windows keeps a dedicated attribute bit.
#[cfg(windows)]
pub fn is_hidden(_path: &Path, meta: &Metadata) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
    meta.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0
}

/// Whether the current process may read the entry.
///
/// Only permissions are consulted. Nothing is opened, so special files such
/// as FIFOs cannot block the caller.
pub async fn is_readable(path: &Path) -> bool {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || may_read(&path))
        .await
        .unwrap_or(false)
}

#[cfg(unix)]
fn may_read(path: &Path) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    // SAFETY: `c_path` is NUL-terminated and outlives the call.
    unsafe { libc::access(c_path.as_ptr(), libc::R_OK) == 0 }
}

/// Windows entries are assumed readable.
#[cfg(not(unix))]
fn may_read(_path: &Path) -> bool {
    true
}
