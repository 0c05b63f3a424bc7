//! Backend target descriptor produced by the path router.

use std::fmt;

/// Kind of cluster resource a request is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Pod,
    Service,
}

impl ResourceKind {
    /// Lowercase name used in paths and diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "pod",
            ResourceKind::Service => "service",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed `/{mount}/{namespace}/{kind}/{name}[/{port}]/{remainder...}` path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    pub namespace: String,
    pub kind: ResourceKind,
    pub name: String,
    /// Port segment, present only for pods.
    pub port: Option<String>,
    /// Sub-path forwarded unchanged to the backend.
    pub remainder: Vec<String>,
    /// Whether the incoming path ended with `/`.
    pub trailing_slash: bool,
    /// The path segments that select this backend, i.e. everything before
    /// the remainder, rendered as `/{mount}/{namespace}/{kind}/{name}[/{port}]`.
    pub prefix: String,
}

impl BackendTarget {
    /// Path to request on the backend, always rooted.
    pub fn backend_path(&self) -> String {
        let mut path = format!("/{}", self.remainder.join("/"));
        if self.trailing_slash && !path.ends_with('/') {
            path.push('/');
        }
        path
    }
}
