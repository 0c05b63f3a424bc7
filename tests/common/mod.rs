//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use flate2::{write::GzEncoder, Compression};
use tokio::net::TcpListener;

use console_proxy::config::ProxyConfig;
use console_proxy::discovery::StaticDirectory;
use console_proxy::{HttpServer, Shutdown};

pub const PAGE: &str = r##"<!DOCTYPE html>
<html><head><link rel="stylesheet" href="/static/site.css"><script src="app.js"></script></head>
<body>
<a id="root" href="/logs/">Logs</a>
<a id="relative" href="details?tab=env#top">Details</a>
<a id="external" href="https://example.org/docs">Docs</a>
<a id="anchor" href="#section">Section</a>
<a id="mail" href="mailto:ops@example.org">Mail</a>
<img src="../img/logo.png">
</body></html>"##;

/// A running proxy and the pieces tests need to talk to it.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the mock backend on an ephemeral port.
///
/// - `/page/index.html`: HTML with a mix of rewritable and foreign links
/// - `/gzip/index.html`: the same page, gzip encoded
/// - `/data.json`: JSON that merely looks like it has links
/// - `/stream`: three chunks, 300ms apart
/// - anything else: echoes method, URI and request headers as text
pub async fn start_mock_backend() -> SocketAddr {
    let app = Router::new()
        .route("/page/index.html", get(page))
        .route("/gzip/index.html", get(gzip_page))
        .route("/data.json", get(json))
        .route("/stream", get(stream))
        .fallback(echo);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn page() -> Response {
    (
        [(header::CONTENT_TYPE, "text/html; charset=utf-8"), (header::ETAG, "\"v1\"")],
        PAGE,
    )
        .into_response()
}

async fn gzip_page() -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/html"),
            (header::CONTENT_ENCODING, "gzip"),
        ],
        gzip(PAGE.as_bytes()),
    )
        .into_response()
}

async fn json() -> Response {
    (
        [(header::CONTENT_TYPE, "application/json")],
        r#"{"html":"<a href=\"/logs/\">Logs</a>"}"#,
    )
        .into_response()
}

async fn stream() -> Response {
    let chunks = futures_util::stream::unfold(0u32, |n| async move {
        if n == 3 {
            return None;
        }
        if n > 0 {
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        Some((Ok::<_, std::io::Error>(format!("line {}\n", n)), n + 1))
    });
    (
        [(header::CONTENT_TYPE, "text/plain")],
        Body::from_stream(chunks),
    )
        .into_response()
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap) -> String {
    let mut out = format!("{} {}\n", method, uri);
    for (name, value) in &headers {
        out.push_str(&format!("{}: {}\n", name, value.to_str().unwrap_or("<binary>")));
    }
    out
}

/// The directory every test proxy uses: a pod and a service in `default`
/// both pointing at `backend`, a pod without an IP, and a service that
/// points at a closed port.
pub fn directory(backend: SocketAddr, closed_port: u16) -> StaticDirectory {
    let ip = backend.ip().to_string();
    StaticDirectory::new()
        .with_pod("default", "web-0", Some(ip.clone()))
        .with_pod("default", "pending", None)
        .with_service("default", "console", Some(ip.clone()), Some(backend.port()))
        .with_service("default", "down", Some(ip), Some(closed_port))
}

/// A port on localhost nothing listens on.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Start a proxy in front of a fresh mock backend.
pub async fn start_proxy() -> (TestProxy, SocketAddr) {
    start_proxy_with(ProxyConfig::default()).await
}

pub async fn start_proxy_with(mut config: ProxyConfig) -> (TestProxy, SocketAddr) {
    let backend = start_mock_backend().await;
    let closed = closed_port().await;

    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.timeouts.connect_secs = 2;
    config.timeouts.request_secs = 5;

    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, Arc::new(directory(backend, closed)));
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    (TestProxy { addr, shutdown }, backend)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .unwrap()
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn gunzip(data: &[u8]) -> String {
    use std::io::Read;
    let mut out = String::new();
    flate2::read::GzDecoder::new(data).read_to_string(&mut out).unwrap();
    out
}
