//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → [routing decomposes the path, discovery resolves the backend]
//!     → forward.rs (outbound request, headers.rs stamps X-Forwarded-*)
//!     → [rewrite touches HTML responses]
//!     → flush.rs (periodic flushing of the streamed body)
//!     → Send to client
//! ```

pub mod flush;
pub mod forward;
pub mod headers;
pub mod request;
pub mod resources;
pub mod response;
pub mod server;

pub use forward::ForwardingDispatcher;
pub use headers::RequestOrigin;
pub use request::X_REQUEST_ID;
pub use server::HttpServer;
