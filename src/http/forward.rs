//! Request forwarding to resolved backends.
//!
//! # Responsibilities
//! - Build the backend URL from the resolved address and the sub-path
//! - Copy method, end-to-end headers and the streamed body
//! - Stamp forwarding headers
//! - Hand HTML responses to the rewriter, stream everything else
//! - Turn transport failures into a 503
//!
//! # Design Decisions
//! - The request timeout bounds the wait for response headers only, so
//!   long-lived streams (log tails, watches) are not cut off
//! - No retries: request bodies are streamed and cannot be replayed

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, Response, Uri, Version},
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

use crate::config::{ProxySettings, RewriteConfig, TimeoutConfig};
use crate::discovery::ResolvedAddress;
use crate::http::flush::FlushingBody;
use crate::http::headers::{inject_forwarded_headers, strip_hop_by_hop, RequestOrigin};
use crate::http::response::{error_chain, service_unavailable};
use crate::rewrite::{ForwardContext, ResponseRewriter};
use crate::routing::BackendTarget;

/// Issues proxied requests and post-processes their responses.
#[derive(Debug, Clone)]
pub struct ForwardingDispatcher {
    client: Client<HttpConnector, Body>,
    request_timeout: Duration,
    flush_interval: Duration,
    rewriter: ResponseRewriter,
}

impl ForwardingDispatcher {
    pub fn new(timeouts: &TimeoutConfig, proxy: &ProxySettings, rewrite: &RewriteConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            request_timeout: Duration::from_secs(timeouts.request_secs),
            flush_interval: proxy.flush_interval(),
            rewriter: ResponseRewriter::new(rewrite.clone()),
        }
    }

    /// Forward `request` to `addr` and return the response for the client.
    ///
    /// Never fails: transport errors become a 503 naming the backend URL.
    pub async fn forward(
        &self,
        request: Request<Body>,
        target: &BackendTarget,
        addr: &ResolvedAddress,
        origin: &RequestOrigin,
    ) -> Response<Body> {
        let destination = destination_url(target, addr, request.uri().query());

        let source = match Url::parse(&destination) {
            Ok(url) => url,
            Err(e) => return service_unavailable(&destination, &e.to_string()),
        };
        let uri: Uri = match destination.parse() {
            Ok(uri) => uri,
            Err(e) => return service_unavailable(&destination, &e.to_string()),
        };

        let ctx = ForwardContext {
            scheme: origin.scheme.clone(),
            host: origin.host.clone(),
            path_prefix: target.prefix.clone(),
            source,
        };

        let (mut parts, body) = request.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        parts.headers.remove(header::HOST);
        let forwarded_uri = format!("{}{}", ctx.path_prefix, target.backend_path());
        inject_forwarded_headers(&mut parts.headers, origin, &forwarded_uri);
        parts.uri = uri;
        parts.version = Version::HTTP_11;
        let outbound = Request::from_parts(parts, body);

        tracing::debug!(
            method = %outbound.method(),
            destination = %destination,
            "Forwarding request"
        );

        let pending = tokio::time::timeout(self.request_timeout, self.client.request(outbound));
        let response: Response<Incoming> = match pending.await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                let error = error_chain(&e);
                tracing::warn!(destination = %destination, error = %error, "Backend unreachable");
                return service_unavailable(&destination, &error);
            }
            Err(_) => {
                let error = format!("no response within {:?}", self.request_timeout);
                tracing::warn!(destination = %destination, error = %error, "Backend timed out");
                return service_unavailable(&destination, &error);
            }
        };

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        let response = Response::from_parts(parts, Body::new(body));

        let response = if self.rewriter.applies_to(&response) {
            self.rewriter.rewrite(response, &ctx).await
        } else {
            response
        };

        let interval = self.flush_interval;
        response.map(|body| Body::new(FlushingBody::new(body, interval)))
    }
}

/// `http://{host}:{port}/{remainder}`, keeping a trailing slash and the query.
pub fn destination_url(
    target: &BackendTarget,
    addr: &ResolvedAddress,
    query: Option<&str>,
) -> String {
    let mut url = format!("http://{}{}", addr.authority(), target.backend_path());
    if let Some(query) = query {
        url.push('?');
        url.push_str(query);
    }
    url
}
