use std::sync::Arc;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info};

use crate::http::dispatch::Dispatcher;
use crate::http::parser::{ParseError, find_headers_end, parse_http_request};
use crate::http::request::Request;
use crate::http::transmit::{Silent, TransferObserver};
use crate::http::writer::ResponseWriter;
use crate::server::transport::Transport;

/// Largest request head accepted before the request counts as malformed.
pub const MAX_HEAD_SIZE: usize = 64 * 1024;
/// Largest request (head and body) buffered at once.
pub const MAX_REQUEST_SIZE: usize = 1024 * 1024;

const READ_CHUNK: usize = 4096;

pub struct Connection<S> {
    stream: S,
    buffer: BytesMut,
    state: ConnectionState,
    dispatcher: Arc<Dispatcher>,
    observer: Arc<dyn TransferObserver>,
    peer: String,
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    Writing(ResponseWriter, bool), // bool = keep_alive?
    Closed,
}

impl<S: Transport> Connection<S> {
    pub fn new(stream: S, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            state: ConnectionState::Reading,
            dispatcher,
            observer: Arc::new(Silent),
            peer: String::from("-"),
        }
    }

    /// Label used in log lines for this connection.
    pub fn with_peer(mut self, peer: impl Into<String>) -> Self {
        self.peer = peer.into();
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn TransferObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Serves requests until the client leaves or a response closes the connection.
    ///
    /// Responses are written strictly in request order. An error means the
    /// connection broke mid-exchange and must be dropped.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            let state = std::mem::replace(&mut self.state, ConnectionState::Closed);

            match state {
                ConnectionState::Reading => {
                    match self.read_request().await? {
                        Some(req) => {
                            self.state = ConnectionState::Processing(req);
                        }
                        None => {
                            self.state = ConnectionState::Closed;
                        }
                    }
                }

                ConnectionState::Processing(req) => {
                    let keep_alive = req.keep_alive();
                    let response = self
                        .dispatcher
                        .respond(&req)
                        .await
                        .finalize(keep_alive, req.version);

                    info!(
                        peer = %self.peer,
                        method = req.method.as_str(),
                        path = %req.path,
                        status = response.status.as_u16(),
                        keep_alive,
                        "Request handled"
                    );

                    let writer = ResponseWriter::new(response);
                    self.state = ConnectionState::Writing(writer, keep_alive);
                }

                ConnectionState::Writing(writer, keep_alive) => {
                    writer
                        .write_to_stream(&mut self.stream, self.observer.as_ref())
                        .await?;

                    if keep_alive {
                        self.state = ConnectionState::Reading; // go back for next request
                    } else {
                        if let Err(e) = self.stream.shutdown().await {
                            debug!(peer = %self.peer, error = %e, "Shutdown after response failed");
                        }
                        self.state = ConnectionState::Closed;
                    }
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        Ok(())
    }

    /// Reads the next request.
    ///
    /// Returns `None` when the client closes the connection between requests
    /// (or abandons a partial one). Undecodable input yields
    /// [`Request::malformed`] so it can be answered with 400.
    pub async fn read_request(&mut self) -> anyhow::Result<Option<Request>> {
        loop {
            // Try parsing whatever we already have
            match parse_http_request(&self.buffer) {
                Ok((request, consumed)) => {
                    // Remove consumed bytes
                    self.buffer.advance(consumed);
                    return Ok(Some(request));
                }

                Err(ParseError::Incomplete) => {
                    if self.over_limit() {
                        debug!(peer = %self.peer, buffered = self.buffer.len(), "Request too large");
                        self.buffer.clear();
                        return Ok(Some(Request::malformed()));
                    }
                }

                Err(e) => {
                    debug!(peer = %self.peer, error = ?e, "Malformed request");
                    self.buffer.clear();
                    return Ok(Some(Request::malformed()));
                }
            }

            // Read more data
            self.buffer.reserve(READ_CHUNK);
            let n = self.stream.read_buf(&mut self.buffer).await?;

            if n == 0 {
                // Client closed connection
                return Ok(None);
            }
        }
    }

    fn over_limit(&self) -> bool {
        let head_done = find_headers_end(&self.buffer).is_some();
        (!head_done && self.buffer.len() > MAX_HEAD_SIZE) || self.buffer.len() > MAX_REQUEST_SIZE
    }
}
