use std::fmt;

use tokio::fs::File;

use crate::http::request::Version;

/// HTTP status codes the server answers with.
///
/// - `Ok` (200): file or directory listing
/// - `BadRequest` (400): malformed request
/// - `Forbidden` (403): unsafe path or not a regular file
/// - `NotFound` (404): missing or hidden target
/// - `MethodNotAllowed` (405): anything but GET
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 403 Forbidden
    Forbidden,
    /// 404 Not Found
    NotFound,
    /// 405 Method Not Allowed
    MethodNotAllowed,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use dirserve::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use dirserve::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    /// assert_eq!(StatusCode::Forbidden.reason_phrase(), "Forbidden");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
        }
    }
}

/// Formats as `"<code> <reason>"`, e.g. `"403 Forbidden"`.
impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}

/// Response headers in insertion order.
///
/// Names compare case-insensitively; setting an existing name replaces its
/// value in place so that the serialized order stays stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&key)) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// An open file to be streamed after the response head.
#[derive(Debug)]
pub struct FileBody {
    pub file: File,
    pub len: u64,
}

#[derive(Debug)]
pub enum Body {
    /// Fully buffered content
    Full(Vec<u8>),
    /// File content, written by the transmitter
    File(FileBody),
}

impl Body {
    /// Number of bytes the body puts on the wire.
    pub fn content_length(&self) -> u64 {
        match self {
            Body::Full(bytes) => bytes.len() as u64,
            Body::File(file) => file.len,
        }
    }
}

/// Represents a complete HTTP response ready to be sent to a client.
#[derive(Debug)]
pub struct Response {
    /// The HTTP status code
    pub status: StatusCode,
    /// HTTP headers
    pub headers: Headers,
    /// Response body
    pub body: Body,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Content-Type", "text/plain")
///     .body(b"hi".to_vec())
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Headers,
    body: Body,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Body::Full(Vec::new()),
        }
    }

    /// Adds or replaces a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(key, value);
        self
    }

    /// Sets a buffered response body.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Body::Full(body);
        self
    }

    /// Sets an open file as the response body.
    pub fn file(mut self, file: File, len: u64) -> Self {
        self.body = Body::File(FileBody { file, len });
        self
    }

    /// Builds the final Response.
    ///
    /// Adds a Content-Length header from the body size if one is not already present.
    pub fn build(mut self) -> Response {
        if !self.headers.contains("Content-Length") {
            self.headers.set("Content-Length", self.body.content_length().to_string());
        }

        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    /// A 200 OK directory listing.
    pub fn html(page: String) -> Self {
        ResponseBuilder::new(StatusCode::Ok)
            .header("Content-Type", "text/html; charset=UTF-8")
            .body(page.into_bytes())
            .build()
    }

    /// The uniform error response: body `Failure:<status>\r\n` in plain text.
    pub fn failure(status: StatusCode) -> Self {
        ResponseBuilder::new(status)
            .header("Content-Type", "text/plain; charset=UTF-8")
            .body(format!("Failure:{}\r\n", status).into_bytes())
            .build()
    }

    /// Applies the per-connection headers every response carries.
    ///
    /// Content-Length always reflects the actual body. A closing connection
    /// announces `Connection: close`; a persistent HTTP/1.0 connection must
    /// say `keep-alive` explicitly, while HTTP/1.1 is persistent by default.
    pub fn finalize(mut self, keep_alive: bool, version: Version) -> Self {
        self.headers.set("Content-Length", self.body.content_length().to_string());

        if !keep_alive {
            self.headers.set("Connection", "close");
        } else if version == Version::Http10 {
            self.headers.set("Connection", "keep-alive");
        }

        self
    }
}
