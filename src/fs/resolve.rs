use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tracing::debug;

use crate::error::Failure;
use crate::fs::is_hidden;
use crate::http::response::StatusCode;

/// What a validated request path refers to.
#[derive(Debug)]
pub enum ResolvedTarget {
    NotFound,
    Forbidden,
    Directory(PathBuf),
    RegularFile { path: PathBuf, size: u64, file: File },
}

impl ResolvedTarget {
    fn rejected(path: &Path, failure: Failure) -> Self {
        debug!(path = %path.display(), reason = %failure, "Target rejected");
        match failure.status() {
            StatusCode::Forbidden => ResolvedTarget::Forbidden,
            _ => ResolvedTarget::NotFound,
        }
    }
}

/// Maps root-relative paths onto the filesystem.
///
/// The root is canonicalized once; every resolved target must canonicalize
/// to a path below it.
#[derive(Debug, Clone)]
pub struct Resolver {
    root: PathBuf,
}

impl Resolver {
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = std::fs::canonicalize(root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn resolve(&self, relative: &Path) -> ResolvedTarget {
        let path = self.root.join(relative);

        let meta = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(_) => return ResolvedTarget::rejected(&path, Failure::MissingOrHidden),
        };

        // The root itself is served even if its own name looks hidden.
        let is_root = relative.as_os_str().is_empty();
        if !is_root && is_hidden(&path, &meta) {
            return ResolvedTarget::rejected(&path, Failure::MissingOrHidden);
        }

        match tokio::fs::canonicalize(&path).await {
            Ok(real) if real.starts_with(&self.root) => {}
            Ok(_) => return ResolvedTarget::rejected(&path, Failure::UnsafePath),
            Err(_) => return ResolvedTarget::rejected(&path, Failure::MissingOrHidden),
        }

        if meta.is_dir() {
            return ResolvedTarget::Directory(path);
        }

        if !meta.is_file() {
            return ResolvedTarget::rejected(&path, Failure::NotRegularFile);
        }

        // Removed or made unreadable since the metadata call.
        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(_) => return ResolvedTarget::rejected(&path, Failure::FileOpenRace),
        };

        let size = match file.metadata().await {
            Ok(meta) => meta.len(),
            Err(_) => return ResolvedTarget::rejected(&path, Failure::FileOpenRace),
        };

        ResolvedTarget::RegularFile { path, size, file }
    }
}
