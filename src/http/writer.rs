use tokio::io::AsyncWriteExt;

use crate::http::response::{Body, Response};
use crate::http::transmit::{TransferObserver, transmit};
use crate::server::transport::Transport;

const HTTP_VERSION: &str = "HTTP/1.1";

/// Status line and headers, terminated by the blank line.
pub fn serialize_head(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::new();

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    // Headers
    for (k, v) in resp.headers.iter() {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf
}

/// Writes one finalized response.
///
/// Buffered bodies go out with the head in a single write; file bodies are
/// handed to the transmitter once the head is written.
pub struct ResponseWriter {
    buffer: Vec<u8>,
    written: usize,
    body: Body,
}

impl ResponseWriter {
    pub fn new(response: Response) -> Self {
        let mut buffer = serialize_head(&response);
        let body = match response.body {
            Body::Full(bytes) => {
                buffer.extend_from_slice(&bytes);
                Body::Full(Vec::new())
            }
            file => file,
        };

        Self {
            buffer,
            written: 0,
            body,
        }
    }

    pub async fn write_to_stream<S: Transport>(
        self,
        stream: &mut S,
        observer: &dyn TransferObserver,
    ) -> anyhow::Result<()> {
        let Self {
            buffer,
            mut written,
            body,
        } = self;

        while written < buffer.len() {
            let n = stream
                .write(&buffer[written..])
                .await?;

            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }

            written += n;
        }

        match body {
            Body::File(body) => transmit(stream, body.file, body.len, observer).await?,
            Body::Full(_) => stream.flush().await?,
        }

        Ok(())
    }
}
