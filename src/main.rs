//! Console backend proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ routing::PathRouter ──▶ discovery::BackendResolver
//!                                                                      │
//!                                                                      ▼
//!     Client Response                                          http::forward
//!     ◀────────────── http::flush ◀── rewrite (text/html) ◀── ForwardingDispatcher ◀── Backend
//! ```
//!
//! Cross-cutting: `config` (TOML + CLI overrides), `observability` (tracing,
//! Prometheus), `lifecycle` (signals, graceful shutdown), `net` (TLS).

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use console_proxy::config::{
    loader::{read_config, ConfigError},
    validation::validate_config,
    DirectoryConfig, DirectoryKind, ProxyConfig, TlsConfig,
};
use console_proxy::discovery::{Directory, StaticDirectory};
use console_proxy::lifecycle::{shutdown_signal, Shutdown};
use console_proxy::net::tls::load_tls_config;
use console_proxy::observability::{logging::init_logging, metrics::init_metrics};
use console_proxy::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "console-proxy", version)]
#[command(about = "Proxy console traffic to pods and services in the cluster", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "CONSOLE_PROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:9090
    #[arg(long)]
    bind: Option<String>,

    /// Path keyword in front of proxied requests
    #[arg(long)]
    mount: Option<String>,

    /// PEM certificate chain; enables TLS together with --tls-key
    #[arg(long, requires = "tls_key")]
    tls_cert: Option<String>,

    /// PEM private key
    #[arg(long, requires = "tls_cert")]
    tls_key: Option<String>,

    /// Directory of static console assets served at the root
    #[arg(long)]
    static_dir: Option<String>,

    #[arg(long)]
    log_level: Option<String>,

    /// Resolve pods and services against the cluster API
    #[arg(long)]
    kubernetes: bool,
}

impl Cli {
    fn apply(self, config: &mut ProxyConfig) {
        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
        if let Some(mount) = self.mount {
            config.proxy.mount = mount;
        }
        if let (Some(cert_path), Some(key_path)) = (self.tls_cert, self.tls_key) {
            config.listener.tls = Some(TlsConfig { cert_path, key_path });
        }
        if let Some(root) = self.static_dir {
            config.static_files.root = Some(root);
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        if self.kubernetes {
            config.directory.kind = DirectoryKind::Kubernetes;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => ProxyConfig::default(),
    };
    cli.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    init_logging(&config.observability);

    tracing::info!("console-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        mount = %config.proxy.mount,
        directory = ?config.directory.kind,
        request_timeout_secs = config.timeouts.request_secs,
        rewrite = config.rewrite.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let directory = build_directory(&config.directory).await?;

    let tls = match &config.listener.tls {
        Some(tls) => Some(load_tls_config(tls).await?),
        None => None,
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.trigger();
    });

    let mut server = HttpServer::new(config, directory);
    if let Some(tls) = tls {
        server = server.with_tls(tls);
    }
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn build_directory(config: &DirectoryConfig) -> Result<Arc<dyn Directory>, Box<dyn Error>> {
    match config.kind {
        DirectoryKind::Static => Ok(Arc::new(StaticDirectory::from_config(config))),
        #[cfg(feature = "kubernetes")]
        DirectoryKind::Kubernetes => {
            use console_proxy::discovery::kubernetes::KubernetesDirectory;

            let directory = KubernetesDirectory::connect().await?;
            tracing::info!("Using cluster API directory");
            Ok(Arc::new(directory))
        }
        #[cfg(not(feature = "kubernetes"))]
        DirectoryKind::Kubernetes => {
            Err("kubernetes directory requires the `kubernetes` feature".into())
        }
    }
}
