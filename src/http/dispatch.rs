//! Turns a decoded request into a response.

use std::io;
use std::path::Path;

use crate::fs::{ResolvedTarget, Resolver, render_listing, validate};
use crate::http::mime;
use crate::http::request::Request;
use crate::http::response::{Response, ResponseBuilder, StatusCode};

/// Serves one root directory. Cheap to clone and share across connections.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    resolver: Resolver,
}

impl Dispatcher {
    /// Fails if `root` does not exist.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self {
            resolver: Resolver::new(root)?,
        })
    }

    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    /// Validates, resolves and answers `req`.
    ///
    /// The returned response is not finalized yet; connection headers are
    /// applied by the caller, which knows the connection's disposition.
    pub async fn respond(&self, req: &Request) -> Response {
        let target = match validate(req) {
            Ok(target) => target,
            Err(failure) => return Response::failure(failure.status()),
        };

        match self.resolver.resolve(&target.relative).await {
            ResolvedTarget::NotFound => Response::failure(StatusCode::NotFound),
            ResolvedTarget::Forbidden => Response::failure(StatusCode::Forbidden),
            ResolvedTarget::Directory(dir) => {
                Response::html(render_listing(&dir, &target.display).await)
            }
            ResolvedTarget::RegularFile { path, size, file } => {
                ResponseBuilder::new(StatusCode::Ok)
                    .header("Content-Type", mime::content_type(&path))
                    .file(file, size)
                    .build()
            }
        }
    }
}
