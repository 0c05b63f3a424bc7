//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the console proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Path routing and streaming behaviour.
    pub proxy: ProxySettings,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// HTML link rewriting.
    pub rewrite: RewriteConfig,

    /// Where backend addresses come from.
    pub directory: DirectoryConfig,

    /// Optional static asset serving.
    pub static_files: StaticFilesConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9090").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9090".to_string(),
            tls: None,
        }
    }
}

impl ListenerConfig {
    /// Scheme clients use to reach this listener.
    pub fn scheme(&self) -> &'static str {
        if self.tls.is_some() {
            "https"
        } else {
            "http"
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Proxy path and streaming settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxySettings {
    /// First path segment of proxied requests (`/{mount}/{namespace}/...`).
    pub mount: String,

    /// Longest time streamed response bytes may sit in the proxy before
    /// being flushed to the client, in milliseconds. 0 flushes every chunk.
    pub flush_interval_ms: u64,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            mount: "proxy".to_string(),
            flush_interval_ms: 200,
        }
    }
}

impl ProxySettings {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

/// Timeout configuration for backend requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed for the backend to return response headers, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// HTML rewriting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Rewrite same-origin links in HTML responses.
    pub enabled: bool,

    /// Largest HTML body, as received from the backend, that will be
    /// buffered for rewriting. Larger documents are streamed through untouched.
    pub max_body_bytes: usize,

    /// Compression level used when re-encoding gzip bodies (0-9).
    pub gzip_level: u32,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_body_bytes: 10 * 1024 * 1024, // 10MB
            gzip_level: 6,
        }
    }
}

/// Directory implementation selector.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryKind {
    /// Fixed table of pods and services from this file.
    #[default]
    Static,
    /// Live lookups against the cluster API.
    Kubernetes,
}

/// Directory configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DirectoryConfig {
    pub kind: DirectoryKind,

    /// Pods known to the static directory.
    pub pods: Vec<StaticPodConfig>,

    /// Services known to the static directory.
    pub services: Vec<StaticServiceConfig>,
}

/// A pod entry in the static directory.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticPodConfig {
    pub namespace: String,
    pub name: String,
    /// Pod IP; omit to model a pod that is not scheduled yet.
    pub ip: Option<String>,
}

/// A service entry in the static directory.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticServiceConfig {
    pub namespace: String,
    pub name: String,
    pub cluster_ip: Option<String>,
    pub port: Option<u16>,
}

/// Static asset serving.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Directory to serve; static serving is off when unset.
    pub root: Option<String>,

    /// URL prefix the directory is mounted at.
    pub prefix: String,

    /// Page served in place of 404s, for client-side routing. Resolved
    /// against the working directory, like `root`.
    pub not_found_page: Option<String>,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            root: None,
            prefix: "/".to_string(),
            not_found_page: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9464".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: ProxyConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:9090");
        assert_eq!(config.proxy.mount, "proxy");
        assert_eq!(config.proxy.flush_interval(), Duration::from_millis(200));
        assert_eq!(config.directory.kind, DirectoryKind::Static);
        assert!(config.rewrite.enabled);
        assert_eq!(config.listener.scheme(), "http");
    }

    #[test]
    fn test_full_config() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:8443"
            tls = { cert_path = "cert.pem", key_path = "key.pem" }

            [proxy]
            mount = "k8s"
            flush_interval_ms = 50

            [directory]
            kind = "static"

            [[directory.pods]]
            namespace = "default"
            name = "nginx-1"
            ip = "10.0.0.7"

            [[directory.services]]
            namespace = "default"
            name = "myservice"
            cluster_ip = "10.96.0.20"
            port = 8080
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.scheme(), "https");
        assert_eq!(config.proxy.mount, "k8s");
        assert_eq!(config.directory.pods.len(), 1);
        assert_eq!(config.directory.services[0].port, Some(8080));
    }

    #[test]
    fn test_kubernetes_directory_kind() {
        let config: ProxyConfig = toml::from_str("[directory]\nkind = \"kubernetes\"\n").unwrap();
        assert_eq!(config.directory.kind, DirectoryKind::Kubernetes);
    }
}
