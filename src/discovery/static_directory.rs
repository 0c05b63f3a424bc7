//! Directory backed by a fixed table from the configuration file.
//!
//! Used for local development and tests, where no cluster API is reachable.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::config::{DirectoryConfig, StaticPodConfig, StaticServiceConfig};
use crate::discovery::{Directory, PodRecord, PodSummary, ServiceRecord, ServiceSummary};
use crate::error::ResolveError;

type Key = (String, String);

/// In-memory directory keyed by (namespace, name).
#[derive(Debug, Default, Clone)]
pub struct StaticDirectory {
    pods: HashMap<Key, PodRecord>,
    services: HashMap<Key, ServiceRecord>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from the `[directory]` section.
    pub fn from_config(config: &DirectoryConfig) -> Self {
        let mut directory = Self::new();
        for StaticPodConfig { namespace, name, ip } in &config.pods {
            directory = directory.with_pod(namespace, name, ip.clone());
        }
        for StaticServiceConfig {
            namespace,
            name,
            cluster_ip,
            port,
        } in &config.services
        {
            directory = directory.with_service(namespace, name, cluster_ip.clone(), *port);
        }
        tracing::debug!(
            pods = directory.pods.len(),
            services = directory.services.len(),
            "Static directory loaded"
        );
        directory
    }

    /// Register a pod. `ip` may be absent to model an unscheduled pod.
    pub fn with_pod(
        mut self,
        namespace: &str,
        name: &str,
        ip: Option<String>,
    ) -> Self {
        self.pods.insert(
            (namespace.to_string(), name.to_string()),
            PodRecord { ip },
        );
        self
    }

    /// Register a service with its cluster IP and declared port.
    pub fn with_service(
        mut self,
        namespace: &str,
        name: &str,
        cluster_ip: Option<String>,
        port: Option<u16>,
    ) -> Self {
        self.services.insert(
            (namespace.to_string(), name.to_string()),
            ServiceRecord { cluster_ip, port },
        );
        self
    }
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn lookup_pod(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<PodRecord>, ResolveError> {
        Ok(self
            .pods
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn lookup_service(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ServiceRecord>, ResolveError> {
        Ok(self
            .services
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn list_pods(&self, namespace: Option<&str>) -> Result<Vec<PodSummary>, ResolveError> {
        let mut pods: Vec<PodSummary> = self
            .pods
            .iter()
            .filter(|((ns, _), _)| in_namespace(ns, namespace))
            .map(|((ns, name), pod)| PodSummary {
                namespace: ns.clone(),
                name: name.clone(),
                ip: pod.ip.clone(),
            })
            .collect();
        pods.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
        Ok(pods)
    }

    async fn list_services(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<ServiceSummary>, ResolveError> {
        let mut services: Vec<ServiceSummary> = self
            .services
            .iter()
            .filter(|((ns, _), _)| in_namespace(ns, namespace))
            .map(|((ns, name), service)| ServiceSummary {
                namespace: ns.clone(),
                name: name.clone(),
                cluster_ip: service.cluster_ip.clone(),
                port: service.port,
            })
            .collect();
        services.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
        Ok(services)
    }
}

fn in_namespace(candidate: &str, wanted: Option<&str>) -> bool {
    wanted.is_none_or(|ns| ns == candidate)
}
