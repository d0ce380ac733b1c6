use std::collections::HashMap;

/// HTTP request methods.
///
/// Only `GET` is served. Every other method still decodes so that it can be
/// answered with 405 Method Not Allowed instead of 400 Bad Request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// PATCH - Partial modification of a resource
    PATCH,
    /// Any other well-formed method token
    Extension(String),
}

/// Protocol version from the request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
}

/// Represents a parsed HTTP request from a client.
///
/// `decoded` is false when the request line or headers were syntactically
/// invalid; such a request carries placeholder values and is only ever
/// answered with 400 Bad Request.
#[derive(Debug, Clone)]
pub struct Request {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The raw, still percent-encoded request target (e.g., "/docs/read%20me.txt")
    pub path: String,
    /// HTTP version of the request line
    pub version: Version,
    /// Request headers, keyed by lowercase name
    pub headers: HashMap<String, String>,
    /// Request body, if a Content-Length was given
    pub body: Vec<u8>,
    /// Whether the request decoded successfully
    pub decoded: bool,
}

/// Builder for constructing Request objects.
#[derive(Default)]
pub struct RequestBuilder {
    method: Option<Method>,
    path: Option<String>,
    version: Option<Version>,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl Method {
    /// Parses an HTTP method token.
    ///
    /// Method names are case-sensitive. Lowercase or otherwise unknown tokens
    /// become [`Method::Extension`]; `None` is returned only when the string is
    /// not a valid token at all.
    ///
    /// # Example
    ///
    /// ```
    /// # use dirserve::http::request::Method;
    /// assert_eq!(Method::parse("GET"), Some(Method::GET));
    /// assert_eq!(Method::parse("get"), Some(Method::Extension("get".into())));
    /// assert_eq!(Method::parse("GE T"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        let method = match s {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "HEAD" => Method::HEAD,
            "OPTIONS" => Method::OPTIONS,
            "PATCH" => Method::PATCH,
            other if is_token(other) => Method::Extension(other.to_string()),
            _ => return None,
        };
        Some(method)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
            Method::Extension(token) => token,
        }
    }
}

fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

impl Version {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "HTTP/1.0" => Some(Version::Http10),
            "HTTP/1.1" => Some(Version::Http11),
            _ => None,
        }
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        Ok(Request {
            method: self.method.ok_or("method missing")?,
            path: self.path.ok_or("path missing")?,
            version: self.version.unwrap_or(Version::Http11),
            headers: self.headers,
            body: self.body,
            decoded: true,
        })
    }
}

impl Request {
    /// A stand-in for a request that could not be decoded.
    pub fn malformed() -> Self {
        Self {
            method: Method::GET,
            path: String::new(),
            version: Version::Http11,
            headers: HashMap::new(),
            body: Vec::new(),
            decoded: false,
        }
    }

    /// Retrieves a header value by name, ignoring ASCII case.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(&key.to_ascii_lowercase()).map(String::as_str)
    }

    /// Determines whether the connection should remain open after the response.
    ///
    /// HTTP/1.1 is persistent unless the client sends `Connection: close`;
    /// HTTP/1.0 closes unless the client sends `Connection: keep-alive`.
    /// Undecodable requests and requests framed with `Transfer-Encoding`
    /// always close, since the next request cannot be located reliably.
    pub fn keep_alive(&self) -> bool {
        if !self.decoded || self.header("Transfer-Encoding").is_some() {
            return false;
        }

        let has_token = |token: &str| {
            self.header("Connection")
                .map(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case(token)))
                .unwrap_or(false)
        };

        match self.version {
            Version::Http11 => !has_token("close"),
            Version::Http10 => has_token("keep-alive"),
        }
    }
}
