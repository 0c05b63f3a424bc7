//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: proxy mount, ping and listing endpoints, static assets
//! - Wire up middleware (tracing, request ID)
//! - Serve plain HTTP or TLS until shutdown is signalled
//! - Drive each proxied request through route → resolve → forward

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::Service;
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::config::{ProxyConfig, StaticFilesConfig};
use crate::discovery::{BackendResolver, Directory};
use crate::error::ProxyError;
use crate::http::forward::ForwardingDispatcher;
use crate::http::headers::RequestOrigin;
use crate::http::resources;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::lifecycle::shutdown::wait_for;
use crate::observability::metrics;
use crate::routing::PathRouter;

/// In-flight requests get this long to finish once shutdown starts (TLS only).
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<PathRouter>,
    /// Also answers the `/api/*` listings.
    pub directory: Arc<dyn Directory>,
    pub resolver: BackendResolver,
    pub dispatcher: Arc<ForwardingDispatcher>,
    /// Scheme of the listener, used when the request URI has none.
    pub scheme: &'static str,
}

/// HTTP server for the console proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    tls: Option<RustlsConfig>,
}

impl HttpServer {
    /// Create a new HTTP server resolving backends through `directory`.
    pub fn new(config: ProxyConfig, directory: Arc<dyn Directory>) -> Self {
        let state = AppState {
            router: Arc::new(PathRouter::new(config.proxy.mount.clone())),
            resolver: BackendResolver::new(directory.clone()),
            directory,
            dispatcher: Arc::new(ForwardingDispatcher::new(
                &config.timeouts,
                &config.proxy,
                &config.rewrite,
            )),
            scheme: config.listener.scheme(),
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            tls: None,
        }
    }

    /// Serve over TLS with the given certificate material.
    pub fn with_tls(mut self, tls: RustlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let mount = format!("/{}", config.proxy.mount);

        let router = Router::new()
            .route("/api/ping", get(ping_handler))
            .route("/api/pods", get(resources::all_pods))
            .route("/api/{namespace}/pods", get(resources::namespaced_pods))
            .route("/api/services", get(resources::all_services))
            .route("/api/{namespace}/services", get(resources::namespaced_services))
            .route(&mount, any(proxy_handler))
            .route(&format!("{}/", mount), any(proxy_handler))
            .route(&format!("{}/{{*path}}", mount), any(proxy_handler))
            .with_state(state);

        with_static_files(router, &config.static_files)
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        match self.tls {
            Some(tls) => {
                tracing::info!(
                    address = %addr,
                    mount = %self.config.proxy.mount,
                    "HTTPS server starting"
                );

                let handle = axum_server::Handle::new();
                let drain = handle.clone();
                tokio::spawn(async move {
                    wait_for(shutdown).await;
                    drain.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
                });

                axum_server::from_tcp_rustls(listener.into_std()?, tls)
                    .handle(handle)
                    .serve(app)
                    .await?;
            }
            None => {
                tracing::info!(
                    address = %addr,
                    mount = %self.config.proxy.mount,
                    "HTTP server starting"
                );

                axum::serve(listener, app)
                    .with_graceful_shutdown(wait_for(shutdown))
                    .await?;
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Mount the static asset directory, if one is configured.
fn with_static_files(router: Router, config: &StaticFilesConfig) -> Router {
    let Some(root) = &config.root else {
        return router;
    };
    tracing::info!(root = %root, prefix = %config.prefix, "Serving static files");

    match &config.not_found_page {
        Some(page) => attach_static(
            router,
            &config.prefix,
            ServeDir::new(root).not_found_service(ServeFile::new(page)),
        ),
        None => attach_static(router, &config.prefix, ServeDir::new(root)),
    }
}

fn attach_static<S>(router: Router, prefix: &str, service: S) -> Router
where
    S: Service<Request<Body>, Error = Infallible> + Clone + Send + Sync + 'static,
    S::Response: IntoResponse,
    S::Future: Send + 'static,
{
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        router.fallback_service(service)
    } else {
        router.nest_service(prefix, service)
    }
}

async fn ping_handler() -> &'static str {
    "pong"
}

/// Main proxy handler.
/// Decomposes the path, resolves the backend, and forwards the request.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&request);
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Proxying request"
    );

    let target = match state.router.route(&path) {
        Ok(target) => target,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                path = %path,
                error = %e,
                "Malformed proxy path"
            );
            return reject(ProxyError::from(e), &method, "none", start_time);
        }
    };

    let addr = match state.resolver.resolve(&target).await {
        Ok(addr) => addr,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                namespace = %target.namespace,
                kind = %target.kind,
                name = %target.name,
                error = %e,
                "Backend resolution failed"
            );
            return reject(ProxyError::from(e), &method, target.kind.as_str(), start_time);
        }
    };

    let origin = RequestOrigin::from_request(request.uri(), request.headers(), state.scheme, peer);
    let response = state.dispatcher.forward(request, &target, &addr, &origin).await;

    tracing::debug!(
        request_id = %request_id,
        backend = %addr,
        status = %response.status(),
        "Backend responded"
    );
    metrics::record_request(&method, response.status().as_u16(), target.kind.as_str(), start_time);
    response
}

fn reject(error: ProxyError, method: &str, kind: &'static str, start_time: Instant) -> Response {
    metrics::record_request(method, error.status().as_u16(), kind, start_time);
    error.into_response()
}
