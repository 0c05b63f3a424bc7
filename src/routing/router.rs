//! Path router: maps an inbound path onto a backend target.
//!
//! # Responsibilities
//! - Check the mount keyword and the minimum segment count
//! - Classify the resource kind (case-insensitive `pod`)
//! - Split off the forwarded sub-path
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Never panics on short or odd paths; those are `Malformed`

use crate::error::RoutingError;
use crate::routing::target::{BackendTarget, ResourceKind};

/// Segments required before the remainder: mount, namespace, kind, name.
const MIN_SEGMENTS: usize = 4;

/// Decomposes request paths under a fixed mount keyword.
#[derive(Debug, Clone)]
pub struct PathRouter {
    mount: String,
}

impl PathRouter {
    /// Create a router for paths under `/{mount}/`.
    pub fn new(mount: impl Into<String>) -> Self {
        Self {
            mount: mount.into(),
        }
    }

    /// The mount keyword this router answers to.
    pub fn mount(&self) -> &str {
        &self.mount
    }

    /// Parse `path` into a backend target.
    pub fn route(&self, path: &str) -> Result<BackendTarget, RoutingError> {
        let malformed = || RoutingError::Malformed(path.to_string());

        let trimmed = path.trim_matches('/');
        let parts: Vec<&str> = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed.split('/').collect()
        };

        if parts.len() < MIN_SEGMENTS || parts[0] != self.mount {
            return Err(malformed());
        }

        let namespace = parts[1];
        let kind_segment = parts[2];
        let name = parts[3];
        let mut rest = &parts[MIN_SEGMENTS..];

        let (kind, port) = if kind_segment.eq_ignore_ascii_case("pod") {
            let (port, tail) = rest.split_first().ok_or_else(malformed)?;
            rest = tail;
            (ResourceKind::Pod, Some(port.to_string()))
        } else {
            (ResourceKind::Service, None)
        };

        let consumed = parts.len() - rest.len();
        let prefix = format!("/{}", parts[..consumed].join("/"));

        Ok(BackendTarget {
            namespace: namespace.to_string(),
            kind,
            name: name.to_string(),
            port,
            remainder: rest.iter().map(|s| s.to_string()).collect(),
            trailing_slash: path.ends_with('/'),
            prefix,
        })
    }
}

impl Default for PathRouter {
    fn default() -> Self {
        Self::new("proxy")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> PathRouter {
        PathRouter::default()
    }

    #[test]
    fn test_pod_path() {
        let target = router()
            .route("/proxy/default/pod/nginx-1/8080/static/app.js")
            .unwrap();
        assert_eq!(target.kind, ResourceKind::Pod);
        assert_eq!(target.namespace, "default");
        assert_eq!(target.name, "nginx-1");
        assert_eq!(target.port.as_deref(), Some("8080"));
        assert_eq!(target.remainder, vec!["static", "app.js"]);
        assert_eq!(target.prefix, "/proxy/default/pod/nginx-1/8080");
        assert!(!target.trailing_slash);
    }

    #[test]
    fn test_kind_is_case_insensitive() {
        let target = router().route("/proxy/ns/POD/web/80").unwrap();
        assert_eq!(target.kind, ResourceKind::Pod);
        assert!(target.remainder.is_empty());

        let target = router().route("/proxy/ns/Pod/web/80/a").unwrap();
        assert_eq!(target.kind, ResourceKind::Pod);
    }

    #[test]
    fn test_service_path_consumes_no_port() {
        let target = router()
            .route("/proxy/default/service/myservice/8080/index.html")
            .unwrap();
        assert_eq!(target.kind, ResourceKind::Service);
        assert_eq!(target.port, None);
        assert_eq!(target.remainder, vec!["8080", "index.html"]);
        assert_eq!(target.prefix, "/proxy/default/service/myservice");
    }

    #[test]
    fn test_any_other_kind_is_a_service() {
        let target = router().route("/proxy/default/services/api/").unwrap();
        assert_eq!(target.kind, ResourceKind::Service);
        assert!(target.remainder.is_empty());
        assert!(target.trailing_slash);
    }

    #[test]
    fn test_trailing_slash_recorded() {
        let target = router().route("/proxy/default/service/myservice/").unwrap();
        assert!(target.trailing_slash);
        assert_eq!(target.backend_path(), "/");

        let target = router().route("/proxy/default/service/myservice/docs/").unwrap();
        assert_eq!(target.backend_path(), "/docs/");
    }

    #[test]
    fn test_short_paths_are_malformed() {
        for path in ["", "/", "/proxy", "/proxy/default", "/proxy/default/pod", "///"] {
            assert_eq!(
                router().route(path),
                Err(RoutingError::Malformed(path.to_string())),
                "path {:?}",
                path
            );
        }
    }

    #[test]
    fn test_wrong_mount_is_malformed() {
        assert!(router().route("/api/default/service/web").is_err());
        // Mount keyword comparison is case-sensitive.
        assert!(router().route("/Proxy/default/service/web").is_err());
    }

    #[test]
    fn test_pod_without_port_is_malformed() {
        assert!(router().route("/proxy/default/pod/nginx-1").is_err());
        assert!(router().route("/proxy/default/pod/nginx-1/").is_err());
    }

    #[test]
    fn test_custom_mount() {
        let router = PathRouter::new("k8s");
        assert_eq!(router.mount(), "k8s");
        assert!(router.route("/k8s/default/service/web").is_ok());
        assert!(router.route("/proxy/default/service/web").is_err());
    }
}
