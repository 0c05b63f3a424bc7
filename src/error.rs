//! Error types for the request pipeline.
//!
//! Routing and resolution errors end the request and are reported to the
//! client. Rewrite errors never reach the client: the rewriter logs them and
//! falls back to the backend's original bytes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Failure to decompose a request path into a backend target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// Wrong mount keyword, too few segments, or a pod path without a port.
    #[error("unable to determine kind and namespace from path '{0}'")]
    Malformed(String),
}

/// Failure to turn a backend target into a dialable address.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The directory has no such resource, or it has no address yet.
    #[error("{kind} '{name}' not found in namespace '{namespace}'")]
    NotFound {
        kind: &'static str,
        namespace: String,
        name: String,
    },

    /// The port segment of a pod path is not a valid TCP port.
    #[error("invalid port '{0}'")]
    InvalidPort(String),

    /// The directory itself could not be queried.
    #[error("directory lookup failed: {0}")]
    Directory(String),
}

/// Reasons the rewriter declined to touch a response.
#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("unsupported content encoding '{0}'")]
    UnsupportedEncoding(String),

    #[error("failed to decode body: {0}")]
    Decode(#[source] std::io::Error),

    #[error("failed to encode body: {0}")]
    Encode(#[source] std::io::Error),

    #[error("failed to render document: {0}")]
    Render(#[source] std::io::Error),

    /// The decoded document is larger than the rewrite limit.
    #[error("decoded body exceeds {0} bytes")]
    TooLarge(usize),

    /// The blocking rewrite task panicked or was cancelled.
    #[error("rewrite task failed: {0}")]
    Task(String),
}

/// Terminal errors for a proxied request.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The upstream body failed while it was being buffered for rewriting.
    #[error("upstream body error: {0}")]
    UpstreamBody(String),
}

impl ProxyError {
    /// Status code reported to the client for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Routing(RoutingError::Malformed(_)) => StatusCode::BAD_REQUEST,
            ProxyError::Resolve(ResolveError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ProxyError::Resolve(ResolveError::InvalidPort(_)) => StatusCode::BAD_REQUEST,
            ProxyError::Resolve(ResolveError::Directory(_)) => StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamBody(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let malformed = ProxyError::from(RoutingError::Malformed("/x".into()));
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

        let missing = ProxyError::from(ResolveError::NotFound {
            kind: "pod",
            namespace: "default".into(),
            name: "web-0".into(),
        });
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            missing.to_string(),
            "pod 'web-0' not found in namespace 'default'"
        );

        let directory = ProxyError::from(ResolveError::Directory("timeout".into()));
        assert_eq!(directory.status(), StatusCode::BAD_GATEWAY);
    }
}
