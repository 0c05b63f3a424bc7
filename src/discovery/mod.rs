//! Backend discovery subsystem.
//!
//! # Data Flow
//! ```text
//! BackendTarget (namespace, kind, name, port?)
//!     → resolver.rs (BackendResolver)
//!     → Directory (static table or cluster API)
//!     → ResolvedAddress (host, port)
//!
//! /api/{namespace}/pods, /api/services, ...
//!     → Directory::list_pods / list_services
//!     → PodSummary / ServiceSummary (JSON)
//! ```
//!
//! # Design Decisions
//! - The directory is queried on every request; nothing is cached
//! - Directory implementations only report what they know; the resolver
//!   decides what counts as "not found"

pub mod resolver;
pub mod static_directory;

#[cfg(feature = "kubernetes")]
pub mod kubernetes;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::ResolveError;

pub use resolver::{BackendResolver, ResolvedAddress};
pub use static_directory::StaticDirectory;

/// What the directory knows about a pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodRecord {
    /// Assigned pod IP, if scheduling has progressed that far.
    pub ip: Option<String>,
}

/// What the directory knows about a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    /// Cluster-internal IP.
    pub cluster_ip: Option<String>,
    /// First port declared in the service spec.
    pub port: Option<u16>,
}

/// One entry of a pod listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PodSummary {
    pub namespace: String,
    pub name: String,
    pub ip: Option<String>,
}

/// One entry of a service listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceSummary {
    pub namespace: String,
    pub name: String,
    #[serde(rename = "clusterIP")]
    pub cluster_ip: Option<String>,
    pub port: Option<u16>,
}

/// Source of live backend addresses.
///
/// Lookups return `Ok(None)` when the resource does not exist and `Err` only
/// when the directory could not answer at all.
#[async_trait]
pub trait Directory: Send + Sync + std::fmt::Debug {
    /// Look up a pod by namespace and name.
    async fn lookup_pod(&self, namespace: &str, name: &str)
        -> Result<Option<PodRecord>, ResolveError>;

    /// Look up a service by namespace and name.
    async fn lookup_service(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ServiceRecord>, ResolveError>;

    /// List pods in `namespace`, or in every namespace when `None`.
    async fn list_pods(&self, namespace: Option<&str>) -> Result<Vec<PodSummary>, ResolveError>;

    /// List services in `namespace`, or in every namespace when `None`.
    async fn list_services(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<ServiceSummary>, ResolveError>;
}
