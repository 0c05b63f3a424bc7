//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (split, check mount keyword, classify kind)
//!     → target.rs (BackendTarget: namespace, kind, name, port, remainder)
//!     → Return: BackendTarget or RoutingError::Malformed
//! ```
//!
//! # Design Decisions
//! - Routing is a pure function of the path string
//! - Only the kind segment is compared case-insensitively
//! - The port segment is consumed for pods only; services get theirs from
//!   the directory

pub mod router;
pub mod target;

pub use router::PathRouter;
pub use target::{BackendTarget, ResourceKind};
