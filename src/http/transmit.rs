//! File body transmission.
//!
//! Plain TCP connections get a zero-copy `sendfile(2)` of the whole file.
//! Encrypted connections must see every byte in user space, so the file is
//! read and written in fixed-size chunks instead.

use std::io;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, trace};

use crate::server::transport::Transport;

/// Read size for the encrypted path.
pub const CHUNK_SIZE: usize = 8192;

/// Diagnostic hooks fired while a file is sent.
///
/// Nothing depends on these; implementations must not fail the transfer.
pub trait TransferObserver: Send + Sync {
    /// `total` is `None` when the length is not known up front.
    fn on_progress(&self, _sent: u64, _total: Option<u64>) {}

    fn on_complete(&self) {}
}

/// Ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl TransferObserver for Silent {}

/// Logs progress at `trace` and completion at `debug`.
#[derive(Debug, Clone)]
pub struct LoggingObserver {
    peer: String,
}

impl LoggingObserver {
    pub fn new(peer: impl Into<String>) -> Self {
        Self { peer: peer.into() }
    }
}

impl TransferObserver for LoggingObserver {
    fn on_progress(&self, sent: u64, total: Option<u64>) {
        match total {
            Some(total) => trace!(peer = %self.peer, sent, total, "Transfer progress"),
            None => trace!(peer = %self.peer, sent, "Transfer progress"),
        }
    }

    fn on_complete(&self) {
        debug!(peer = %self.peer, "Transfer complete");
    }
}

/// Writes exactly `len` bytes of `file` to `stream`, then flushes.
///
/// The response head must already have been written. The file is closed when
/// this returns, whether or not the transfer succeeded.
pub async fn transmit<S: Transport>(
    stream: &mut S,
    file: File,
    len: u64,
    observer: &dyn TransferObserver,
) -> io::Result<()> {
    if stream.is_encrypted() {
        send_chunked(stream, file, len, observer).await?;
    } else {
        send_whole(stream, file, len, observer).await?;
    }

    // Terminator: nothing left but what the transport still buffers.
    stream.flush().await?;
    observer.on_complete();
    Ok(())
}

async fn send_whole<S: Transport>(
    stream: &mut S,
    file: File,
    len: u64,
    observer: &dyn TransferObserver,
) -> io::Result<()> {
    // The head has to reach the socket before the kernel appends the file.
    stream.flush().await?;

    #[cfg(target_os = "linux")]
    if let Some(socket) = stream.raw_socket() {
        let file = file.into_std().await;
        return zero_copy::send_all(socket, &file, len, observer).await;
    }

    let mut body = file.take(len);
    let copied = tokio::io::copy(&mut body, stream).await?;
    if copied < len {
        return Err(truncated());
    }
    observer.on_progress(copied, Some(len));
    Ok(())
}

async fn send_chunked<S: Transport>(
    stream: &mut S,
    mut file: File,
    len: u64,
    observer: &dyn TransferObserver,
) -> io::Result<()> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut sent = 0u64;

    while sent < len {
        let want = (len - sent).min(CHUNK_SIZE as u64) as usize;
        let n = file.read(&mut buf[..want]).await?;
        if n == 0 {
            return Err(truncated());
        }

        stream.write_all(&buf[..n]).await?;
        sent += n as u64;
        observer.on_progress(sent, Some(len));
    }

    Ok(())
}

fn truncated() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "file shrank during transfer")
}

#[cfg(target_os = "linux")]
mod zero_copy {
    use std::io;
    use std::os::fd::AsRawFd;

    use tokio::io::Interest;
    use tokio::net::TcpStream;

    use super::{TransferObserver, truncated};

    /// Largest count Linux transfers in one `sendfile` call.
    const MAX_PER_CALL: usize = 0x7fff_f000;

    pub(super) async fn send_all(
        socket: &TcpStream,
        file: &std::fs::File,
        len: u64,
        observer: &dyn TransferObserver,
    ) -> io::Result<()> {
        let end = libc::off_t::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "file too large"))?;
        let mut offset: libc::off_t = 0;

        while offset < end {
            socket.writable().await?;

            let count = usize::try_from(end - offset)
                .unwrap_or(MAX_PER_CALL)
                .min(MAX_PER_CALL);

            let result = socket.try_io(Interest::WRITABLE, || {
                // SAFETY: both descriptors are borrowed and stay open for the call;
                // `offset` is a valid, exclusively borrowed off_t.
                let ret = unsafe {
                    libc::sendfile(socket.as_raw_fd(), file.as_raw_fd(), &mut offset, count)
                };
                if ret < 0 {
                    Err(io::Error::last_os_error())
                } else {
                    Ok(ret as usize)
                }
            });

            match result {
                Ok(0) => return Err(truncated()),
                Ok(_) => observer.on_progress(offset as u64, Some(len)),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }
}
