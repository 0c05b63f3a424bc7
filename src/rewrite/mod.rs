//! HTML response rewriting subsystem.
//!
//! # Data Flow
//! ```text
//! Backend response
//!     → mod.rs (text/html? supported encoding? buffer body)
//!     → encoding.rs (gunzip)
//!     → html.rs (parse, walk elements, render)
//!         → rules.rs (which tag/attribute pairs carry URLs)
//!         → links.rs (re-root same-origin links under the proxy prefix)
//!     → encoding.rs (gzip again)
//!     → fix Content-Length, drop digest headers
//! ```
//!
//! # Design Decisions
//! - Fail open: anything the rewriter cannot handle is served unmodified
//! - Non-HTML responses are never buffered
//! - Rewriting state lives in a per-request `ForwardContext`

pub mod encoding;
pub mod html;
pub mod links;
pub mod rules;

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, Response},
    response::IntoResponse,
};
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use http_body_util::BodyExt;
use url::Url;

use crate::config::RewriteConfig;
use crate::error::{ProxyError, RewriteError};
use crate::observability::metrics;

pub use encoding::ContentCoding;
pub use html::{rewrite_document, RewrittenDocument};
pub use links::rewrite_link;

/// Headers describing the exact body bytes; stale once the body changes.
const BODY_DIGEST_HEADERS: &[&str] = &["content-md5", "digest", "repr-digest", "content-digest"];

/// Per-request values needed to rewrite links.
///
/// Built fresh for every proxied request and only ever read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardContext {
    /// Scheme the client used to reach the proxy.
    pub scheme: String,
    /// Host (and port) the client used to reach the proxy, if known.
    pub host: Option<String>,
    /// Proxy path that selects the backend, e.g. `/proxy/default/pod/web-0/8080`.
    pub path_prefix: String,
    /// Backend URL the page was fetched from.
    pub source: Url,
}

/// Rewrites links in HTML responses so navigation stays on the proxy.
#[derive(Debug, Clone)]
pub struct ResponseRewriter {
    config: RewriteConfig,
}

impl ResponseRewriter {
    pub fn new(config: RewriteConfig) -> Self {
        Self { config }
    }

    /// Whether `response` is an HTML document the rewriter should look at.
    pub fn applies_to<B>(&self, response: &Response<B>) -> bool {
        self.config.enabled && is_html(response.headers())
    }

    /// Rewrite same-origin links in an HTML response.
    ///
    /// Responses that are not HTML, use an encoding other than gzip, are too
    /// large, or cannot be decoded are returned with their original bytes.
    pub async fn rewrite(&self, response: Response<Body>, ctx: &ForwardContext) -> Response<Body> {
        if !self.applies_to(&response) {
            return response;
        }

        let coding = match ContentCoding::from_headers(response.headers()) {
            Ok(coding) => coding,
            Err(e) => {
                tracing::warn!(
                    source = %ctx.source,
                    error = %e,
                    "Not rewriting links in HTML response"
                );
                metrics::record_rewrite("unsupported_encoding");
                return response;
            }
        };

        let (mut parts, body) = response.into_parts();
        let raw = match buffer_body(body, self.config.max_body_bytes).await {
            Ok(Buffered::Complete(raw)) => raw,
            Ok(Buffered::Overflow(body)) => {
                tracing::debug!(
                    source = %ctx.source,
                    limit = self.config.max_body_bytes,
                    "HTML response too large to rewrite, streaming as is"
                );
                metrics::record_rewrite("too_large");
                return Response::from_parts(parts, body);
            }
            Err(e) => {
                tracing::error!(
                    source = %ctx.source,
                    error = %e,
                    "Failed to read HTML response body"
                );
                metrics::record_rewrite("body_error");
                return e.into_response();
            }
        };

        let rewritten = self.rewrite_off_thread(coding, raw.clone(), ctx.clone()).await;

        match rewritten {
            Ok(Some((encoded, links))) => {
                tracing::debug!(
                    source = %ctx.source,
                    links,
                    original_bytes = raw.len(),
                    rewritten_bytes = encoded.len(),
                    "Rewrote HTML links"
                );
                metrics::record_rewrite("rewritten");
                replace_body_headers(&mut parts.headers, encoded.len());
                Response::from_parts(parts, Body::from(encoded))
            }
            Ok(None) => {
                metrics::record_rewrite("unchanged");
                Response::from_parts(parts, Body::from(raw))
            }
            Err(RewriteError::TooLarge(limit)) => {
                tracing::debug!(
                    source = %ctx.source,
                    limit,
                    "Decoded HTML too large to rewrite, serving original body"
                );
                metrics::record_rewrite("too_large");
                Response::from_parts(parts, Body::from(raw))
            }
            Err(e) => {
                tracing::warn!(
                    source = %ctx.source,
                    error = %e,
                    "HTML rewrite failed, serving original body"
                );
                metrics::record_rewrite("failed");
                Response::from_parts(parts, Body::from(raw))
            }
        }
    }

    /// Decode, rewrite and re-encode on the blocking pool.
    ///
    /// `Ok(None)` means no link changed.
    async fn rewrite_off_thread(
        &self,
        coding: ContentCoding,
        raw: Bytes,
        ctx: ForwardContext,
    ) -> Result<Option<(Vec<u8>, usize)>, RewriteError> {
        let limit = self.config.max_body_bytes;
        let level = self.config.gzip_level;

        tokio::task::spawn_blocking(move || {
            let decoded = coding.decode(&raw, limit)?;
            let doc = rewrite_document(&decoded, &ctx)?;
            if doc.links_rewritten == 0 {
                return Ok(None);
            }
            let links = doc.links_rewritten;
            coding.encode(doc.html, level).map(|encoded| Some((encoded, links)))
        })
        .await
        .map_err(|e| RewriteError::Task(e.to_string()))?
    }
}

impl Default for ResponseRewriter {
    fn default() -> Self {
        Self::new(RewriteConfig::default())
    }
}

/// True when the media type of `Content-Type`, parameters ignored, is
/// `text/html`. Malformed parameters do not matter.
pub fn is_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|essence| {
            essence
                .trim()
                .eq_ignore_ascii_case(mime::TEXT_HTML.essence_str())
        })
}

enum Buffered {
    Complete(Bytes),
    /// The body exceeded the limit; the buffered prefix is chained back in
    /// front of the unread remainder.
    Overflow(Body),
}

async fn buffer_body(mut body: Body, limit: usize) -> Result<Buffered, ProxyError> {
    let mut buf = BytesMut::new();
    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|e| ProxyError::UpstreamBody(e.to_string()))?;
        // Trailers cannot be carried on a rewritten body.
        let Ok(data) = frame.into_data() else {
            continue;
        };
        buf.extend_from_slice(&data);
        if buf.len() > limit {
            let head = buf.freeze();
            let stream = futures_util::stream::once(async move { Ok::<_, axum::Error>(head) })
                .chain(body.into_data_stream());
            return Ok(Buffered::Overflow(Body::from_stream(stream)));
        }
    }
    Ok(Buffered::Complete(buf.freeze()))
}

fn replace_body_headers(headers: &mut HeaderMap, len: usize) {
    headers.remove(header::CONTENT_LENGTH);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    headers.remove(header::ETAG);
    for name in BODY_DIGEST_HEADERS {
        headers.remove(HeaderName::from_static(name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn ctx() -> ForwardContext {
        ForwardContext {
            scheme: "http".into(),
            host: Some("console:9090".into()),
            path_prefix: "/proxy/default/pod/nginx-1/8080".into(),
            source: Url::parse("http://10.1.2.3:8080/a/b/index.html").unwrap(),
        }
    }

    fn response(content_type: &str, encoding: Option<&str>, body: impl Into<Body>) -> Response<Body> {
        let mut builder = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::ETAG, "\"abc\"")
            .header("digest", "sha-256=xyz");
        if let Some(encoding) = encoding {
            builder = builder.header(header::CONTENT_ENCODING, encoding);
        }
        builder.body(body.into()).unwrap()
    }

    async fn body_bytes(response: Response<Body>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    const PAGE: &str = r#"<html><head></head><body><a href="/foo">foo</a><img src="images/logo.png"></body></html>"#;

    #[test]
    fn test_is_html() {
        let mut headers = HeaderMap::new();
        assert!(!is_html(&headers));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
        assert!(is_html(&headers));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("TEXT/HTML"));
        assert!(is_html(&headers));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html ; charset=utf-8"));
        assert!(is_html(&headers));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset"));
        assert!(is_html(&headers));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(" text/html"));
        assert!(is_html(&headers));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/htmlx"));
        assert!(!is_html(&headers));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/xhtml+xml"));
        assert!(!is_html(&headers));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        assert!(!is_html(&headers));
    }

    #[tokio::test]
    async fn test_rewrites_plain_html() {
        let rewriter = ResponseRewriter::default();
        let response = rewriter.rewrite(response("text/html", None, PAGE), &ctx()).await;

        let headers = response.headers().clone();
        let body = body_bytes(response).await;
        let html = std::str::from_utf8(&body).unwrap();
        assert!(html.contains(r#"href="http://console:9090/proxy/default/pod/nginx-1/8080/foo""#));
        assert!(html.contains(r#"src="http://console:9090/proxy/default/pod/nginx-1/8080/a/b/images/logo.png""#));
        assert_eq!(headers[header::CONTENT_LENGTH], body.len().to_string().as_str());
        assert!(headers.get(header::ETAG).is_none());
        assert!(headers.get("digest").is_none());
    }

    #[tokio::test]
    async fn test_gzip_is_transparent() {
        let rewriter = ResponseRewriter::default();
        let plain = body_bytes(rewriter.rewrite(response("text/html", None, PAGE), &ctx()).await).await;

        let compressed = ContentCoding::Gzip.encode(PAGE.as_bytes().to_vec(), 6).unwrap();
        let response = rewriter
            .rewrite(response("text/html", Some("gzip"), compressed), &ctx())
            .await;
        assert_eq!(response.headers()[header::CONTENT_ENCODING], "gzip");
        let body = body_bytes(response).await;
        assert_eq!(ContentCoding::Gzip.decode(&body, 1 << 20).unwrap(), plain.to_vec());
    }

    #[tokio::test]
    async fn test_unknown_encoding_passes_through() {
        let rewriter = ResponseRewriter::default();
        let response = rewriter
            .rewrite(response("text/html", Some("br"), "not really brotli"), &ctx())
            .await;
        assert_eq!(response.headers()[header::ETAG], "\"abc\"");
        assert_eq!(body_bytes(response).await, "not really brotli");
    }

    #[tokio::test]
    async fn test_non_html_untouched() {
        let rewriter = ResponseRewriter::default();
        let json = r#"{"href":"/foo"}"#;
        let response = rewriter.rewrite(response("application/json", None, json), &ctx()).await;
        assert_eq!(response.headers()[header::ETAG], "\"abc\"");
        assert_eq!(body_bytes(response).await, json);
    }

    #[tokio::test]
    async fn test_corrupt_gzip_served_as_is() {
        let rewriter = ResponseRewriter::default();
        let response = rewriter
            .rewrite(response("text/html", Some("gzip"), "garbage"), &ctx())
            .await;
        assert_eq!(response.headers()[header::CONTENT_ENCODING], "gzip");
        assert_eq!(body_bytes(response).await, "garbage");
    }

    #[tokio::test]
    async fn test_document_without_links_keeps_original_bytes() {
        let rewriter = ResponseRewriter::default();
        let page = "<p>no links here";
        let response = rewriter.rewrite(response("text/html", None, page), &ctx()).await;
        assert_eq!(response.headers()[header::ETAG], "\"abc\"");
        assert_eq!(body_bytes(response).await, page);
    }

    #[tokio::test]
    async fn test_oversized_body_streams_through() {
        let rewriter = ResponseRewriter::new(RewriteConfig {
            max_body_bytes: 16,
            ..RewriteConfig::default()
        });
        let response = rewriter.rewrite(response("text/html", None, PAGE), &ctx()).await;
        assert_eq!(body_bytes(response).await, PAGE);
    }

    #[tokio::test]
    async fn test_oversized_gzip_streams_through_unchanged() {
        let rewriter = ResponseRewriter::new(RewriteConfig {
            max_body_bytes: 16,
            ..RewriteConfig::default()
        });
        let compressed = ContentCoding::Gzip.encode(PAGE.as_bytes().to_vec(), 6).unwrap();
        assert!(compressed.len() > 16);

        let response = rewriter
            .rewrite(response("text/html", Some("gzip"), compressed.clone()), &ctx())
            .await;
        assert_eq!(response.headers()[header::CONTENT_ENCODING], "gzip");
        assert_eq!(response.headers()[header::ETAG], "\"abc\"");
        assert_eq!(body_bytes(response).await, compressed);
    }

    #[tokio::test]
    async fn test_decoded_size_is_bounded() {
        let limit = 64 * 1024;
        let rewriter = ResponseRewriter::new(RewriteConfig {
            max_body_bytes: limit,
            ..RewriteConfig::default()
        });
        let mut page = PAGE.as_bytes().to_vec();
        page.resize(4 * 1024 * 1024, b' ');
        let compressed = ContentCoding::Gzip.encode(page, 9).unwrap();
        assert!(compressed.len() < limit);

        let response = rewriter
            .rewrite(response("text/html", Some("gzip"), compressed.clone()), &ctx())
            .await;
        assert_eq!(response.headers()[header::ETAG], "\"abc\"");
        assert_eq!(body_bytes(response).await, compressed);
    }

    #[tokio::test]
    async fn test_rewrite_leaves_runtime_responsive() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let mut page = String::from("<html><body>");
        for i in 0..50_000 {
            page.push_str(&format!(r#"<a href="/item/{}">{}</a>"#, i, i));
        }
        page.push_str("</body></html>");

        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = {
            let ticks = ticks.clone();
            tokio::spawn(async move {
                loop {
                    ticks.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                }
            })
        };

        // Single-threaded runtime: the ticker only runs while the rewrite yields.
        let response = ResponseRewriter::default()
            .rewrite(response("text/html", None, page), &ctx())
            .await;
        let observed = ticks.load(Ordering::SeqCst);
        ticker.abort();

        assert!(observed >= 2, "ticker ran {} times during the rewrite", observed);
        let body = body_bytes(response).await;
        let html = std::str::from_utf8(&body).unwrap();
        assert!(html.contains("/proxy/default/pod/nginx-1/8080/item/49999"));
    }

    #[tokio::test]
    async fn test_disabled_rewriter() {
        let rewriter = ResponseRewriter::new(RewriteConfig {
            enabled: false,
            ..RewriteConfig::default()
        });
        let response = rewriter.rewrite(response("text/html", None, PAGE), &ctx()).await;
        assert_eq!(body_bytes(response).await, PAGE);
    }
}
