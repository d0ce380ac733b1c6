//! End-to-end tests: real sockets against a server rooted in a temp directory.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use dirserve::http::connection::Connection;
use dirserve::http::dispatch::Dispatcher;
use dirserve::server::listener::serve;
use dirserve::server::transport::Secured;
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

struct Reply {
    status: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Reply {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("docs")).unwrap();
    std::fs::write(dir.path().join("docs").join("readme.txt"), "hello12345").unwrap();
    std::fs::write(dir.path().join("docs").join("guide.html"), "<p>guide</p>").unwrap();
    std::fs::write(dir.path().join("readme.txt"), "top level").unwrap();
    std::fs::write(dir.path().join(".env"), "SECRET=1").unwrap();
    dir
}

async fn start(root: &Path) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let dispatcher = Arc::new(Dispatcher::new(root).unwrap());
    tokio::spawn(serve(listener, dispatcher));
    addr
}

async fn read_reply<R: AsyncRead + Unpin>(stream: &mut R) -> Reply {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        let n = stream.read(&mut byte).await.unwrap();
        assert!(n > 0, "connection closed inside response head");
        head.push(byte[0]);
    }

    let head = String::from_utf8(head).unwrap();
    let mut lines = head.split("\r\n");
    let status = lines.next().unwrap().to_string();
    let headers: Vec<(String, String)> = lines
        .filter(|l| !l.is_empty())
        .map(|l| {
            let (k, v) = l.split_once(": ").unwrap();
            (k.to_string(), v.to_string())
        })
        .collect();

    let mut reply = Reply {
        status,
        headers,
        body: Vec::new(),
    };
    let len: usize = reply.header("Content-Length").unwrap().parse().unwrap();
    reply.body = vec![0u8; len];
    stream.read_exact(&mut reply.body).await.unwrap();
    reply
}

async fn assert_closed<R: AsyncRead + Unpin>(stream: &mut R) {
    let mut rest = Vec::new();
    stream.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty(), "unexpected trailing bytes: {rest:?}");
}

#[cfg(unix)]
fn make_fifo(path: &Path) {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes()).unwrap();
    assert_eq!(unsafe { libc::mkfifo(c_path.as_ptr(), 0o644) }, 0);
}

async fn exchange(addr: SocketAddr, request: &str) -> (Reply, TcpStream) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let reply = read_reply(&mut stream).await;
    (reply, stream)
}

#[tokio::test]
async fn test_serves_file() {
    let dir = fixture();
    let addr = start(dir.path()).await;

    let (reply, mut stream) = exchange(
        addr,
        "GET /docs/readme.txt HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert_eq!(reply.status, "HTTP/1.1 200 OK");
    assert_eq!(reply.header("Content-Length"), Some("10"));
    assert_eq!(reply.header("Content-Type"), Some("text/plain"));
    assert_eq!(reply.header("Connection"), Some("close"));
    assert_eq!(reply.body, b"hello12345");
    assert_closed(&mut stream).await;
}

#[tokio::test]
async fn test_large_file_round_trip() {
    let dir = fixture();
    let bytes: Vec<u8> = (0..3_000_000u32).map(|i| (i % 253) as u8).collect();
    std::fs::write(dir.path().join("big.bin"), &bytes).unwrap();
    let addr = start(dir.path()).await;

    let (reply, _stream) = exchange(addr, "GET /big.bin HTTP/1.1\r\n\r\n").await;

    assert_eq!(reply.status, "HTTP/1.1 200 OK");
    assert_eq!(reply.header("Content-Type"), Some("application/octet-stream"));
    assert_eq!(reply.body.len(), bytes.len());
    assert!(reply.body == bytes);
}

#[tokio::test]
async fn test_traversal_is_forbidden() {
    let dir = fixture();
    let addr = start(dir.path()).await;

    for target in ["/../secret", "/docs/../readme.txt", "/%2e%2e/secret", "/docs/./readme.txt"] {
        let (reply, _) = exchange(addr, &format!("GET {target} HTTP/1.1\r\n\r\n")).await;

        assert_eq!(reply.status, "HTTP/1.1 403 Forbidden", "{target}");
        assert_eq!(reply.body, b"Failure:403 Forbidden\r\n");
        assert_eq!(
            reply.header("Content-Type"),
            Some("text/plain; charset=UTF-8")
        );
    }
}

#[tokio::test]
async fn test_dotfile_is_never_served() {
    let dir = fixture();
    let addr = start(dir.path()).await;

    let (reply, _) = exchange(addr, "GET /.env HTTP/1.1\r\n\r\n").await;
    assert_eq!(reply.status, "HTTP/1.1 403 Forbidden");
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let dir = fixture();
    let addr = start(dir.path()).await;

    let (reply, _) = exchange(addr, "GET /missing.txt HTTP/1.1\r\n\r\n").await;

    assert_eq!(reply.status, "HTTP/1.1 404 Not Found");
    assert_eq!(reply.body, b"Failure:404 Not Found\r\n");
    assert_eq!(reply.header("Content-Length"), Some("23"));
}

#[tokio::test]
async fn test_post_is_method_not_allowed() {
    let dir = fixture();
    let addr = start(dir.path()).await;

    let (reply, _) = exchange(
        addr,
        "POST /readme.txt HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc",
    )
    .await;

    assert_eq!(reply.status, "HTTP/1.1 405 Method Not Allowed");
    assert_eq!(reply.body, b"Failure:405 Method Not Allowed\r\n");
}

#[tokio::test]
async fn test_malformed_request_is_bad_request_and_closes() {
    let dir = fixture();
    let addr = start(dir.path()).await;

    let (reply, mut stream) = exchange(addr, "GARBAGE\r\n\r\n").await;

    assert_eq!(reply.status, "HTTP/1.1 400 Bad Request");
    assert_eq!(reply.body, b"Failure:400 Bad Request\r\n");
    assert_eq!(reply.header("Connection"), Some("close"));
    assert_closed(&mut stream).await;
}

#[tokio::test]
async fn test_directory_listing() {
    let dir = fixture();
    let addr = start(dir.path()).await;

    let (reply, _) = exchange(addr, "GET /docs/ HTTP/1.1\r\n\r\n").await;
    let page = String::from_utf8(reply.body.clone()).unwrap();

    assert_eq!(reply.status, "HTTP/1.1 200 OK");
    assert_eq!(
        reply.header("Content-Type"),
        Some("text/html; charset=UTF-8")
    );
    assert_eq!(page.matches(">..</a>").count(), 1);
    assert!(page.contains("<a href=\"guide.html\">guide.html</a>"));
    assert!(page.contains("<a href=\"readme.txt\">readme.txt</a>"));
    assert!(page.contains("Listing of: /docs/"));
    assert!(!page.contains(&dir.path().display().to_string()));
}

#[tokio::test]
async fn test_root_listing_hides_dotfiles() {
    let dir = fixture();
    let addr = start(dir.path()).await;

    let (reply, _) = exchange(addr, "GET / HTTP/1.1\r\n\r\n").await;
    let page = String::from_utf8(reply.body).unwrap();

    assert!(page.contains("<a href=\"docs\">docs</a>"));
    assert!(page.contains("<a href=\"readme.txt\">readme.txt</a>"));
    assert!(!page.contains(".env"));
}

#[tokio::test]
async fn test_keep_alive_serves_identical_replies() {
    let dir = fixture();
    let addr = start(dir.path()).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let request = "GET /docs/readme.txt HTTP/1.1\r\nHost: localhost\r\n\r\n";
    stream.write_all(request.as_bytes()).await.unwrap();
    let first = read_reply(&mut stream).await;
    stream.write_all(request.as_bytes()).await.unwrap();
    let second = read_reply(&mut stream).await;

    assert_eq!(first.status, second.status);
    assert_eq!(first.headers, second.headers);
    assert_eq!(first.body, second.body);
    assert_eq!(first.header("Connection"), None);
}

#[tokio::test]
async fn test_pipelined_requests_answered_in_order() {
    let dir = fixture();
    let addr = start(dir.path()).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream
        .write_all(
            b"GET /docs/readme.txt HTTP/1.1\r\n\r\n\
              GET /missing HTTP/1.1\r\n\r\n\
              GET /readme.txt HTTP/1.1\r\nConnection: close\r\n\r\n",
        )
        .await
        .unwrap();

    assert_eq!(read_reply(&mut stream).await.body, b"hello12345");
    assert_eq!(read_reply(&mut stream).await.status, "HTTP/1.1 404 Not Found");
    assert_eq!(read_reply(&mut stream).await.body, b"top level");
    assert_closed(&mut stream).await;
}

#[tokio::test]
async fn test_http10_keep_alive_is_explicit() {
    let dir = fixture();
    let addr = start(dir.path()).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let request = "GET /readme.txt HTTP/1.0\r\nConnection: keep-alive\r\n\r\n";
    stream.write_all(request.as_bytes()).await.unwrap();
    let first = read_reply(&mut stream).await;
    assert_eq!(first.header("Connection"), Some("keep-alive"));

    // Still open for another request.
    stream.write_all(request.as_bytes()).await.unwrap();
    let second = read_reply(&mut stream).await;
    assert_eq!(second.body, b"top level");
}

#[tokio::test]
async fn test_http10_error_keep_alive_is_explicit() {
    let dir = fixture();
    let addr = start(dir.path()).await;

    let (reply, _) = exchange(
        addr,
        "GET /missing HTTP/1.0\r\nConnection: keep-alive\r\n\r\n",
    )
    .await;

    assert_eq!(reply.status, "HTTP/1.1 404 Not Found");
    assert_eq!(reply.header("Connection"), Some("keep-alive"));
}

#[tokio::test]
async fn test_http10_without_keep_alive_closes() {
    let dir = fixture();
    let addr = start(dir.path()).await;

    let (reply, mut stream) = exchange(addr, "GET /readme.txt HTTP/1.0\r\n\r\n").await;

    assert_eq!(reply.header("Connection"), Some("close"));
    assert_eq!(reply.body, b"top level");
    assert_closed(&mut stream).await;
}

#[tokio::test]
async fn test_secured_connection_uses_chunked_path() {
    let dir = fixture();
    let bytes: Vec<u8> = (0..200_000u32).map(|i| (i % 241) as u8).collect();
    std::fs::write(dir.path().join("big.bin"), &bytes).unwrap();
    let dispatcher = Arc::new(Dispatcher::new(dir.path()).unwrap());

    let (mut client, server) = tokio::io::duplex(16 * 1024);
    let task = tokio::spawn(async move {
        let mut conn = Connection::new(Secured(server), dispatcher);
        conn.run().await
    });

    client
        .write_all(b"GET /big.bin HTTP/1.1\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let reply = read_reply(&mut client).await;

    assert_eq!(reply.status, "HTTP/1.1 200 OK");
    assert_eq!(reply.header("Content-Length"), Some("200000"));
    assert!(reply.body == bytes);
    assert_closed(&mut client).await;
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_client_disconnect_mid_transfer_fails_cleanly() {
    let dir = fixture();
    let bytes = vec![7u8; 4 * 1024 * 1024];
    std::fs::write(dir.path().join("huge.bin"), &bytes).unwrap();
    let dispatcher = Arc::new(Dispatcher::new(dir.path()).unwrap());

    let (mut client, server) = tokio::io::duplex(8 * 1024);
    let task = tokio::spawn(async move {
        let mut conn = Connection::new(Secured(server), dispatcher);
        conn.run().await
    });

    client
        .write_all(b"GET /huge.bin HTTP/1.1\r\n\r\n")
        .await
        .unwrap();
    let mut some = [0u8; 1024];
    client.read_exact(&mut some).await.unwrap();
    drop(client);

    assert!(task.await.unwrap().is_err());
}

#[tokio::test]
async fn test_client_closing_between_requests_is_clean() {
    let dir = fixture();
    let dispatcher = Arc::new(Dispatcher::new(dir.path()).unwrap());

    let (mut client, server) = tokio::io::duplex(8 * 1024);
    let task = tokio::spawn(async move {
        let mut conn = Connection::new(server, dispatcher);
        conn.run().await
    });

    client
        .write_all(b"GET /readme.txt HTTP/1.1\r\n\r\n")
        .await
        .unwrap();
    assert_eq!(read_reply(&mut client).await.body, b"top level");
    drop(client);

    assert!(task.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_oversized_head_is_bad_request() {
    let dir = fixture();
    let dispatcher = Arc::new(Dispatcher::new(dir.path()).unwrap());

    let (mut client, server) = tokio::io::duplex(1 << 20);
    let task = tokio::spawn(async move {
        let mut conn = Connection::new(server, dispatcher);
        conn.run().await
    });

    let mut request = String::from("GET / HTTP/1.1\r\nX-Filler: ");
    request.push_str(&"a".repeat(70 * 1024));
    client.write_all(request.as_bytes()).await.unwrap();

    let reply = read_reply(&mut client).await;
    assert_eq!(reply.status, "HTTP/1.1 400 Bad Request");
    assert_eq!(reply.header("Connection"), Some("close"));
    assert_closed(&mut client).await;
    task.await.unwrap().unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn test_special_file_is_forbidden() {
    let dir = fixture();
    make_fifo(&dir.path().join("pipe"));
    let addr = start(dir.path()).await;

    let (reply, mut stream) = tokio::time::timeout(
        std::time::Duration::from_secs(3),
        exchange(addr, "GET /pipe HTTP/1.1\r\nConnection: close\r\n\r\n"),
    )
    .await
    .expect("request for a FIFO blocked");

    assert_eq!(reply.status, "HTTP/1.1 403 Forbidden");
    assert_eq!(reply.body, b"Failure:403 Forbidden\r\n");
    assert_closed(&mut stream).await;
}

#[cfg(unix)]
#[tokio::test]
async fn test_listing_with_special_file_answers() {
    let dir = fixture();
    make_fifo(&dir.path().join("pipe"));
    let addr = start(dir.path()).await;

    let (reply, mut stream) = tokio::time::timeout(
        std::time::Duration::from_secs(3),
        exchange(addr, "GET / HTTP/1.1\r\nConnection: close\r\n\r\n"),
    )
    .await
    .expect("listing blocked on a FIFO");

    let page = String::from_utf8(reply.body).unwrap();
    assert_eq!(reply.status, "HTTP/1.1 200 OK");
    assert!(page.contains("<li><a href=\"docs\">docs</a></li>"));
    assert!(page.contains("<li><a href=\"readme.txt\">readme.txt</a></li>"));
    assert!(!page.contains("pipe"));
    assert_closed(&mut stream).await;
}
