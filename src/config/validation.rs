//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Check static directory entries are dialable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::config::schema::{DirectoryKind, ProxyConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed configuration for values serde cannot rule out.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.is_empty() {
            errors.push(ValidationError::new("listener.tls.cert_path", "must not be empty"));
        }
        if tls.key_path.is_empty() {
            errors.push(ValidationError::new("listener.tls.key_path", "must not be empty"));
        }
    }

    let mount = &config.proxy.mount;
    if mount.is_empty() {
        errors.push(ValidationError::new("proxy.mount", "must not be empty"));
    } else if mount.contains('/') {
        errors.push(ValidationError::new("proxy.mount", "must be a single path segment"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be greater than 0"));
    }

    if config.rewrite.max_body_bytes == 0 {
        errors.push(ValidationError::new("rewrite.max_body_bytes", "must be greater than 0"));
    }
    if config.rewrite.gzip_level > 9 {
        errors.push(ValidationError::new("rewrite.gzip_level", "must be between 0 and 9"));
    }

    if config.directory.kind == DirectoryKind::Static {
        for (i, pod) in config.directory.pods.iter().enumerate() {
            if let Some(ip) = &pod.ip {
                if ip.parse::<IpAddr>().is_err() {
                    errors.push(ValidationError::new(
                        format!("directory.pods[{}].ip", i),
                        format!("'{}' is not an IP address", ip),
                    ));
                }
            }
        }
        for (i, svc) in config.directory.services.iter().enumerate() {
            if let Some(ip) = &svc.cluster_ip {
                if ip.parse::<IpAddr>().is_err() {
                    errors.push(ValidationError::new(
                        format!("directory.services[{}].cluster_ip", i),
                        format!("'{}' is not an IP address", ip),
                    ));
                }
            }
            if svc.port == Some(0) {
                errors.push(ValidationError::new(
                    format!("directory.services[{}].port", i),
                    "must be greater than 0",
                ));
            }
        }
    } else if !cfg!(feature = "kubernetes") {
        errors.push(ValidationError::new(
            "directory.kind",
            "kubernetes directory requires the `kubernetes` feature",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if !config.static_files.prefix.starts_with('/') {
        errors.push(ValidationError::new("static_files.prefix", "must start with '/'"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
