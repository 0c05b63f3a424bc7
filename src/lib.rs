//! Console backend proxy library.
//!
//! Routes `/{mount}/{namespace}/{kind}/{name}[/{port}]/...` requests to pods
//! and services inside a cluster and rewrites links in the HTML they return
//! so browser navigation stays on the proxy.

pub mod config;
pub mod discovery;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod rewrite;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
