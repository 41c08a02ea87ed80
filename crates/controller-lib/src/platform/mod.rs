//! Typed capability interface over the orchestration platform
//!
//! The controller consumes exactly six operations: list workloads,
//! patch workload resources, patch workload replicas, list pods, list
//! quota objects, and list per-pod metrics records. Each operation has
//! a strongly typed response schema so the rest of the crate never
//! touches dynamic API objects, and tests can substitute an in-memory
//! fake for the live cluster.

mod k8s;

#[cfg(test)]
pub(crate) mod fake;

pub use k8s::KubeCluster;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by platform operations.
///
/// Callers treat every variant as transient: log, skip the cycle, and
/// self-correct on the next observation.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("api request failed: {0}")]
    Api(#[from] kube::Error),

    #[error("unexpected response shape: {0}")]
    Schema(String),

    #[error("platform unavailable: {0}")]
    Unavailable(String),
}

/// A container's declared resource requests, as quantity strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    pub cpu_request: Option<String>,
    pub memory_request: Option<String>,
}

/// One deployable unit owned by a tenant namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadSpec {
    pub name: String,
    pub replicas: u32,
    pub containers: Vec<ContainerSpec>,
}

/// A live pod and its container resource requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodSpec {
    pub name: String,
    pub containers: Vec<ContainerSpec>,
}

/// A quota object's hard resource limits, as quantity strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaRecord {
    pub name: String,
    pub cpu_limit: Option<String>,
    pub memory_limit: Option<String>,
}

/// Usage reported for one container by the metrics pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerUsage {
    pub name: String,
    pub cpu: String,
    pub memory: String,
}

/// Per-pod metrics record, joined to pods by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodUsage {
    pub pod_name: String,
    pub containers: Vec<ContainerUsage>,
}

/// Desired resource setting for one container. Requests and limits are
/// written identically; no burst headroom is modeled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerResources {
    pub name: String,
    /// CPU in cores, formatted as a bare number ("5").
    pub cpu: String,
    /// Memory with the Gi suffix ("2.5Gi").
    pub memory: String,
}

/// The six platform operations the controller depends on.
///
/// Implementations must be safe to call concurrently from the control
/// loop and the scale monitor; coordination happens through the
/// platform's own optimistic concurrency, not in-process locking.
#[async_trait]
pub trait ClusterOps: Send + Sync {
    /// List workloads (deployments) in a namespace.
    async fn list_workloads(&self, namespace: &str) -> Result<Vec<WorkloadSpec>, PlatformError>;

    /// Patch container resource requests/limits on one workload.
    async fn patch_workload_resources(
        &self,
        namespace: &str,
        workload: &str,
        containers: &[ContainerResources],
    ) -> Result<(), PlatformError>;

    /// Patch the desired replica count on one workload.
    async fn patch_workload_replicas(
        &self,
        namespace: &str,
        workload: &str,
        replicas: u32,
    ) -> Result<(), PlatformError>;

    /// List live pods in a namespace.
    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodSpec>, PlatformError>;

    /// List quota objects in a namespace.
    async fn list_quotas(&self, namespace: &str) -> Result<Vec<QuotaRecord>, PlatformError>;

    /// List per-pod metrics records in a namespace.
    async fn list_pod_metrics(&self, namespace: &str) -> Result<Vec<PodUsage>, PlatformError>;
}
