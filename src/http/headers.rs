//! Forwarding header injection and hop-by-hop header handling.

use std::net::{IpAddr, SocketAddr};

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Uri};

pub const X_FORWARDED_URI: HeaderName = HeaderName::from_static("x-forwarded-uri");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Headers that describe a single connection and must not be forwarded
/// (RFC 9110 §7.6.1, plus the legacy `Proxy-Connection`).
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// How the client reached the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    /// `http` or `https`.
    pub scheme: String,
    /// `Host` the client addressed, including any port.
    pub host: Option<String>,
    /// Peer address of the client connection.
    pub client_ip: Option<IpAddr>,
}

impl RequestOrigin {
    /// Derive the origin from an inbound request.
    ///
    /// `listener_scheme` is used when the request URI carries no scheme,
    /// which is the norm for HTTP/1.1 origin-form requests.
    pub fn from_request(
        uri: &Uri,
        headers: &HeaderMap,
        listener_scheme: &str,
        peer: Option<SocketAddr>,
    ) -> Self {
        let scheme = uri.scheme_str().unwrap_or(listener_scheme).to_string();
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| uri.authority().map(|a| a.to_string()));
        Self {
            scheme,
            host,
            client_ip: peer.map(|p| p.ip()),
        }
    }
}

/// Stamp `X-Forwarded-*` headers on an outbound request.
///
/// `forwarded_uri` is the path the client asked the proxy for.
pub fn inject_forwarded_headers(
    headers: &mut HeaderMap,
    origin: &RequestOrigin,
    forwarded_uri: &str,
) {
    set(headers, X_FORWARDED_URI, forwarded_uri);
    match &origin.host {
        Some(host) => set(headers, X_FORWARDED_HOST, host),
        None => {
            headers.remove(X_FORWARDED_HOST);
        }
    }
    set(headers, X_FORWARDED_PROTO, &origin.scheme);

    if let Some(ip) = origin.client_ip {
        let prior: Vec<&str> = headers
            .get_all(X_FORWARDED_FOR)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        let value = if prior.is_empty() {
            ip.to_string()
        } else {
            format!("{}, {}", prior.join(", "), ip)
        };
        set(headers, X_FORWARDED_FOR, &value);
    }
}

fn set(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => {
            tracing::debug!(header = %name, "Dropping forwarding header with invalid value");
            headers.remove(name);
        }
    }
}

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}
