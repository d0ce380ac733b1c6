//! The byte stream a connection runs over.
//!
//! TLS is terminated outside this crate. A stream that has already been
//! secured is wrapped in [`Secured`] so the file transmitter knows it cannot
//! hand the socket to the kernel for a zero-copy send.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::net::TcpStream;

pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {
    /// True when bytes written here are encrypted before reaching the socket.
    fn is_encrypted(&self) -> bool;

    /// The underlying socket, when plain bytes can be written to it directly.
    fn raw_socket(&self) -> Option<&TcpStream> {
        None
    }
}

impl Transport for TcpStream {
    fn is_encrypted(&self) -> bool {
        false
    }

    fn raw_socket(&self) -> Option<&TcpStream> {
        Some(self)
    }
}

impl Transport for DuplexStream {
    fn is_encrypted(&self) -> bool {
        false
    }
}

/// A stream encrypted by an outer layer (e.g. a TLS acceptor).
#[derive(Debug)]
pub struct Secured<S>(pub S);

impl<S: AsyncRead + AsyncWrite + Unpin + Send> Transport for Secured<S> {
    fn is_encrypted(&self) -> bool {
        true
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for Secured<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.0).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for Secured<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.0).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.0).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.0).poll_shutdown(cx)
    }
}
