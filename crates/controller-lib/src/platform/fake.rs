//! In-memory platform fake for tests
//!
//! Backed by plain maps behind a mutex. Patches are recorded in order
//! and also applied to the stored workloads so a re-observe after a
//! step sees the mutated state, matching live-cluster behavior.

use super::{
    ClusterOps, ContainerResources, ContainerSpec, PlatformError, PodSpec, PodUsage, QuotaRecord,
    WorkloadSpec,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Everything the fake knows about one namespace.
#[derive(Debug, Default, Clone)]
pub struct FakeNamespace {
    pub workloads: Vec<WorkloadSpec>,
    pub pods: Vec<PodSpec>,
    pub quotas: Vec<QuotaRecord>,
    pub metrics: Vec<PodUsage>,
    pub fail_quotas: bool,
    pub fail_metrics: bool,
    pub fail_patch: bool,
}

/// A patch the fake has accepted, in application order.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchRecord {
    Resources {
        namespace: String,
        workload: String,
        containers: Vec<ContainerResources>,
    },
    Replicas {
        namespace: String,
        workload: String,
        replicas: u32,
    },
}

#[derive(Default)]
pub struct FakeCluster {
    namespaces: Mutex<HashMap<String, FakeNamespace>>,
    patches: Mutex<Vec<PatchRecord>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(self, name: &str, ns: FakeNamespace) -> Self {
        self.namespaces.lock().unwrap().insert(name.to_string(), ns);
        self
    }

    pub fn patches(&self) -> Vec<PatchRecord> {
        self.patches.lock().unwrap().clone()
    }

    fn namespace(&self, name: &str) -> FakeNamespace {
        self.namespaces
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }
}

/// A simple one-container workload for test fixtures.
pub fn workload(name: &str, replicas: u32, cpu_request: &str, memory_request: &str) -> WorkloadSpec {
    WorkloadSpec {
        name: name.to_string(),
        replicas,
        containers: vec![ContainerSpec {
            name: "app".to_string(),
            cpu_request: Some(cpu_request.to_string()),
            memory_request: Some(memory_request.to_string()),
        }],
    }
}

#[async_trait]
impl ClusterOps for FakeCluster {
    async fn list_workloads(&self, namespace: &str) -> Result<Vec<WorkloadSpec>, PlatformError> {
        Ok(self.namespace(namespace).workloads)
    }

    async fn patch_workload_resources(
        &self,
        namespace: &str,
        workload: &str,
        containers: &[ContainerResources],
    ) -> Result<(), PlatformError> {
        let mut namespaces = self.namespaces.lock().unwrap();
        let ns = namespaces.entry(namespace.to_string()).or_default();
        if ns.fail_patch {
            return Err(PlatformError::Unavailable("injected patch failure".into()));
        }

        if let Some(w) = ns.workloads.iter_mut().find(|w| w.name == workload) {
            for c in &mut w.containers {
                if let Some(update) = containers.iter().find(|u| u.name == c.name) {
                    c.cpu_request = Some(update.cpu.clone());
                    c.memory_request = Some(update.memory.clone());
                }
            }
        }

        self.patches.lock().unwrap().push(PatchRecord::Resources {
            namespace: namespace.to_string(),
            workload: workload.to_string(),
            containers: containers.to_vec(),
        });
        Ok(())
    }

    async fn patch_workload_replicas(
        &self,
        namespace: &str,
        workload: &str,
        replicas: u32,
    ) -> Result<(), PlatformError> {
        let mut namespaces = self.namespaces.lock().unwrap();
        let ns = namespaces.entry(namespace.to_string()).or_default();
        if ns.fail_patch {
            return Err(PlatformError::Unavailable("injected patch failure".into()));
        }

        if let Some(w) = ns.workloads.iter_mut().find(|w| w.name == workload) {
            w.replicas = replicas;
        }

        self.patches.lock().unwrap().push(PatchRecord::Replicas {
            namespace: namespace.to_string(),
            workload: workload.to_string(),
            replicas,
        });
        Ok(())
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodSpec>, PlatformError> {
        Ok(self.namespace(namespace).pods)
    }

    async fn list_quotas(&self, namespace: &str) -> Result<Vec<QuotaRecord>, PlatformError> {
        let ns = self.namespace(namespace);
        if ns.fail_quotas {
            return Err(PlatformError::Unavailable("injected quota failure".into()));
        }
        Ok(ns.quotas)
    }

    async fn list_pod_metrics(&self, namespace: &str) -> Result<Vec<PodUsage>, PlatformError> {
        let ns = self.namespace(namespace);
        if ns.fail_metrics {
            return Err(PlatformError::Unavailable(
                "injected metrics failure".into(),
            ));
        }
        Ok(ns.metrics)
    }
}
