//! Backend address resolution.
//!
//! # Responsibilities
//! - Pods: pod IP from the directory, port from the request path
//! - Services: cluster IP and declared port, both from the directory
//!
//! # Design Decisions
//! - Resolved fresh on every call; pods and services move between requests
//! - A resource without an address yet is reported as not found

use std::fmt;
use std::sync::Arc;

use crate::discovery::Directory;
use crate::error::ResolveError;
use crate::routing::{BackendTarget, ResourceKind};

/// A dialable backend address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddress {
    pub host: String,
    pub port: u16,
}

impl ResolvedAddress {
    /// `host:port`, bracketing IPv6 literals.
    pub fn authority(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.authority())
    }
}

/// Resolves backend targets against a directory.
#[derive(Debug, Clone)]
pub struct BackendResolver {
    directory: Arc<dyn Directory>,
}

impl BackendResolver {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    /// Resolve `target` to the address its traffic should be sent to.
    pub async fn resolve(&self, target: &BackendTarget) -> Result<ResolvedAddress, ResolveError> {
        let not_found = || ResolveError::NotFound {
            kind: target.kind.as_str(),
            namespace: target.namespace.clone(),
            name: target.name.clone(),
        };

        let address = match target.kind {
            ResourceKind::Pod => {
                let port_segment = target.port.as_deref().unwrap_or_default();
                let port = parse_port(port_segment)?;
                let pod = self
                    .directory
                    .lookup_pod(&target.namespace, &target.name)
                    .await?
                    .ok_or_else(not_found)?;
                let host = non_empty(pod.ip).ok_or_else(not_found)?;
                ResolvedAddress { host, port }
            }
            ResourceKind::Service => {
                let service = self
                    .directory
                    .lookup_service(&target.namespace, &target.name)
                    .await?
                    .ok_or_else(not_found)?;
                let host = non_empty(service.cluster_ip).ok_or_else(not_found)?;
                let port = service.port.filter(|p| *p != 0).ok_or_else(not_found)?;
                ResolvedAddress { host, port }
            }
        };

        tracing::debug!(
            kind = %target.kind,
            namespace = %target.namespace,
            name = %target.name,
            address = %address,
            "Backend resolved"
        );
        Ok(address)
    }
}

fn parse_port(segment: &str) -> Result<u16, ResolveError> {
    match segment.parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(ResolveError::InvalidPort(segment.to_string())),
    }
}

/// Headless services report `None` as their cluster IP.
fn non_empty(ip: Option<String>) -> Option<String> {
    ip.filter(|ip| !ip.is_empty() && ip != "None")
}
