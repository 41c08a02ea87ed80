//! Kubernetes-backed implementation of the platform capability
//!
//! Workloads are deployments, quotas are `ResourceQuota` objects, and
//! usage comes from `metrics.k8s.io/v1beta1` pod metrics. The metrics
//! group has no typed binding in k8s-openapi, so those records are
//! fetched as dynamic objects and deserialized into the crate's schema.

use super::{
    ClusterOps, ContainerResources, ContainerSpec, ContainerUsage, PlatformError, PodSpec,
    PodUsage, QuotaRecord, WorkloadSpec,
};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Container, Pod, ResourceQuota};
use kube::api::{Api, ApiResource, DynamicObject, ListParams, Patch, PatchParams};
use kube::core::GroupVersionKind;
use kube::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// A live cluster connection.
///
/// Constructed once at startup and injected into every component that
/// needs platform access; construction failure surfaces a single time
/// rather than on every call.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    /// Connect using in-cluster configuration, falling back to the
    /// local kubeconfig (the default inference order of the client).
    pub async fn connect() -> Result<Self, PlatformError> {
        let client = Client::try_default().await?;
        Ok(Self { client })
    }

    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn deployments(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn quotas(&self, namespace: &str) -> Api<ResourceQuota> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn pod_metrics(&self, namespace: &str) -> Api<DynamicObject> {
        let gvk = GroupVersionKind::gvk("metrics.k8s.io", "v1beta1", "PodMetrics");
        let resource = ApiResource::from_gvk_with_plural(&gvk, "pods");
        Api::namespaced_with(self.client.clone(), namespace, &resource)
    }
}

fn container_spec(container: &Container) -> ContainerSpec {
    let requests = container
        .resources
        .as_ref()
        .and_then(|r| r.requests.as_ref());

    ContainerSpec {
        name: container.name.clone(),
        cpu_request: requests.and_then(|r| r.get("cpu")).map(|q| q.0.clone()),
        memory_request: requests.and_then(|r| r.get("memory")).map(|q| q.0.clone()),
    }
}

fn workload_spec(deployment: Deployment) -> WorkloadSpec {
    let name = deployment.metadata.name.unwrap_or_default();
    let spec = deployment.spec;

    let replicas = spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or(1)
        .max(1) as u32;

    let containers = spec
        .and_then(|s| s.template.spec)
        .map(|pod_spec| pod_spec.containers.iter().map(container_spec).collect())
        .unwrap_or_default();

    WorkloadSpec {
        name,
        replicas,
        containers,
    }
}

/// Wire shape of one container entry in a PodMetrics record.
#[derive(Debug, Deserialize)]
struct MetricsContainer {
    name: String,
    #[serde(default)]
    usage: MetricsUsage,
}

#[derive(Debug, Default, Deserialize)]
struct MetricsUsage {
    #[serde(default)]
    cpu: String,
    #[serde(default)]
    memory: String,
}

#[async_trait]
impl ClusterOps for KubeCluster {
    async fn list_workloads(&self, namespace: &str) -> Result<Vec<WorkloadSpec>, PlatformError> {
        let list = self
            .deployments(namespace)
            .list(&ListParams::default())
            .await?;
        Ok(list.items.into_iter().map(workload_spec).collect())
    }

    async fn patch_workload_resources(
        &self,
        namespace: &str,
        workload: &str,
        containers: &[ContainerResources],
    ) -> Result<(), PlatformError> {
        let container_patches: Vec<_> = containers
            .iter()
            .map(|c| {
                json!({
                    "name": c.name,
                    "resources": {
                        "requests": { "cpu": c.cpu, "memory": c.memory },
                        "limits": { "cpu": c.cpu, "memory": c.memory },
                    }
                })
            })
            .collect();

        let patch = json!({
            "spec": { "template": { "spec": { "containers": container_patches } } }
        });

        self.deployments(namespace)
            .patch(workload, &PatchParams::default(), &Patch::Strategic(patch))
            .await?;
        Ok(())
    }

    async fn patch_workload_replicas(
        &self,
        namespace: &str,
        workload: &str,
        replicas: u32,
    ) -> Result<(), PlatformError> {
        let patch = json!({ "spec": { "replicas": replicas } });

        self.deployments(namespace)
            .patch(workload, &PatchParams::default(), &Patch::Merge(patch))
            .await?;
        Ok(())
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodSpec>, PlatformError> {
        let list = self.pods(namespace).list(&ListParams::default()).await?;

        Ok(list
            .items
            .into_iter()
            .map(|pod| {
                let name = pod.metadata.name.unwrap_or_default();
                let containers = pod
                    .spec
                    .map(|s| s.containers.iter().map(container_spec).collect())
                    .unwrap_or_default();
                PodSpec { name, containers }
            })
            .collect())
    }

    async fn list_quotas(&self, namespace: &str) -> Result<Vec<QuotaRecord>, PlatformError> {
        let list = self.quotas(namespace).list(&ListParams::default()).await?;

        Ok(list
            .items
            .into_iter()
            .map(|quota| {
                let name = quota.metadata.name.unwrap_or_default();
                // Status carries the enforced limits once the platform has
                // reconciled the quota; fall back to spec before then.
                let hard = quota
                    .status
                    .and_then(|s| s.hard)
                    .or_else(|| quota.spec.and_then(|s| s.hard));

                QuotaRecord {
                    name,
                    cpu_limit: hard
                        .as_ref()
                        .and_then(|h| h.get("limits.cpu"))
                        .map(|q| q.0.clone()),
                    memory_limit: hard
                        .as_ref()
                        .and_then(|h| h.get("limits.memory"))
                        .map(|q| q.0.clone()),
                }
            })
            .collect())
    }

    async fn list_pod_metrics(&self, namespace: &str) -> Result<Vec<PodUsage>, PlatformError> {
        let list = self
            .pod_metrics(namespace)
            .list(&ListParams::default())
            .await?;

        let mut records = Vec::with_capacity(list.items.len());
        for item in list.items {
            let pod_name = item.metadata.name.clone().unwrap_or_default();

            // A record with an unexpected shape degrades to zero usage
            // rather than failing the whole listing.
            let containers = match item.data.get("containers") {
                Some(value) => {
                    match serde_json::from_value::<Vec<MetricsContainer>>(value.clone()) {
                        Ok(parsed) => parsed
                            .into_iter()
                            .map(|c| ContainerUsage {
                                name: c.name,
                                cpu: c.usage.cpu,
                                memory: c.usage.memory,
                            })
                            .collect(),
                        Err(e) => {
                            debug!(pod = %pod_name, error = %e, "Malformed metrics record");
                            Vec::new()
                        }
                    }
                }
                None => Vec::new(),
            };

            records.push(PodUsage {
                pod_name,
                containers,
            });
        }

        Ok(records)
    }
}
