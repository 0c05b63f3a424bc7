//! Directory backed by the Kubernetes API.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Pod, Service, ServiceSpec};
use kube::{api::ListParams, Api, Client, Resource};

use crate::discovery::{Directory, PodRecord, PodSummary, ServiceRecord, ServiceSummary};
use crate::error::ResolveError;

/// Looks pods and services up through the cluster API on every call.
#[derive(Clone)]
pub struct KubernetesDirectory {
    client: Client,
}

impl std::fmt::Debug for KubernetesDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubernetesDirectory").finish_non_exhaustive()
    }
}

impl KubernetesDirectory {
    /// Connect using the in-cluster service account or the local kubeconfig.
    pub async fn connect() -> Result<Self, ResolveError> {
        let client = Client::try_default()
            .await
            .map_err(|e| ResolveError::Directory(format!("failed to create cluster client: {e}")))?;
        tracing::info!(
            default_namespace = %client.default_namespace(),
            "Connected to cluster API"
        );
        Ok(Self { client })
    }

    /// Namespaced API handle, or a cluster-wide one when `namespace` is `None`.
    fn api<K>(&self, namespace: Option<&str>) -> Api<K>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }
}

fn service_record(spec: Option<ServiceSpec>) -> ServiceRecord {
    let spec = spec.unwrap_or_default();
    let port = spec
        .ports
        .as_ref()
        .and_then(|ports| ports.first())
        .and_then(|port| u16::try_from(port.port).ok());
    ServiceRecord {
        cluster_ip: spec.cluster_ip,
        port,
    }
}

#[async_trait]
impl Directory for KubernetesDirectory {
    async fn lookup_pod(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<PodRecord>, ResolveError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pod = pods.get_opt(name).await.map_err(|e| {
            ResolveError::Directory(format!("failed to get pod {namespace}/{name}: {e}"))
        })?;

        Ok(pod.map(|pod| PodRecord {
            ip: pod.status.and_then(|status| status.pod_ip),
        }))
    }

    async fn lookup_service(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ServiceRecord>, ResolveError> {
        let services: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let service = services.get_opt(name).await.map_err(|e| {
            ResolveError::Directory(format!("failed to get service {namespace}/{name}: {e}"))
        })?;

        Ok(service.map(|service| service_record(service.spec)))
    }

    async fn list_pods(&self, namespace: Option<&str>) -> Result<Vec<PodSummary>, ResolveError> {
        let pods = self
            .api::<Pod>(namespace)
            .list(&ListParams::default())
            .await
            .map_err(|e| ResolveError::Directory(format!("failed to list pods: {e}")))?;

        Ok(pods
            .items
            .into_iter()
            .map(|pod| PodSummary {
                namespace: pod.metadata.namespace.unwrap_or_default(),
                name: pod.metadata.name.unwrap_or_default(),
                ip: pod.status.and_then(|status| status.pod_ip),
            })
            .collect())
    }

    async fn list_services(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<ServiceSummary>, ResolveError> {
        let services = self
            .api::<Service>(namespace)
            .list(&ListParams::default())
            .await
            .map_err(|e| ResolveError::Directory(format!("failed to list services: {e}")))?;

        Ok(services
            .items
            .into_iter()
            .map(|service| {
                let record = service_record(service.spec);
                ServiceSummary {
                    namespace: service.metadata.namespace.unwrap_or_default(),
                    name: service.metadata.name.unwrap_or_default(),
                    cluster_ip: record.cluster_ip,
                    port: record.port,
                }
            })
            .collect())
    }
}
