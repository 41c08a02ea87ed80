//! Observation building
//!
//! Aggregates per-tenant usage, allocation, and replica counts into the
//! normalized observation vector, plus the two cluster-wide utilization
//! aggregates. Usage comes from the metrics listing joined to pods by
//! name; allocation comes from the pods' declared requests.
//!
//! Every failure here degrades instead of aborting: a metrics listing
//! failure yields zero usage for that tenant, a pod with no metrics
//! record contributes nothing, and a malformed quantity string parses
//! to zero. All of those are counted as degraded readings so a silent
//! metric-pipeline outage still shows up in telemetry.

use crate::models::{Observation, Tenant, TenantUtilization, EPSILON};
use crate::platform::{ClusterOps, PodUsage};
use crate::units::{try_parse_cpu_request, try_parse_cpu_usage, try_parse_memory_request, try_parse_memory_usage};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

pub struct StateBuilder {
    ops: Arc<dyn ClusterOps>,
}

/// Raw per-tenant sums before normalization.
#[derive(Debug, Default)]
struct TenantSample {
    cpu_usage: f64,
    mem_usage: f64,
    cpu_allocated: f64,
    mem_allocated: f64,
    replicas: u32,
    degraded: u64,
}

impl StateBuilder {
    pub fn new(ops: Arc<dyn ClusterOps>) -> Self {
        Self { ops }
    }

    /// Observe the full tenant set. Infallible by design: platform
    /// errors degrade the affected tenant to zeros and are counted.
    pub async fn observe(&self, tenants: &[Tenant]) -> Observation {
        let mut per_tenant = Vec::with_capacity(tenants.len());
        let mut degraded_readings = 0u64;

        let mut total_cpu_usage = 0.0;
        let mut total_mem_usage = 0.0;
        let mut total_cpu_ceiling = 0.0;
        let mut total_mem_ceiling = 0.0;

        for tenant in tenants {
            let sample = self.sample_tenant(&tenant.namespace).await;
            degraded_readings += sample.degraded;

            per_tenant.push(TenantUtilization {
                cpu_ratio: sample.cpu_usage / (sample.cpu_allocated + EPSILON),
                mem_ratio: sample.mem_usage / (sample.mem_allocated + EPSILON),
                replica_ratio: f64::from(sample.replicas) / f64::from(tenant.max_replicas.max(1)),
            });

            total_cpu_usage += sample.cpu_usage;
            total_mem_usage += sample.mem_usage;
            total_cpu_ceiling += tenant.cpu_ceiling_cores;
            total_mem_ceiling += tenant.mem_ceiling_gib;
        }

        Observation {
            tenants: per_tenant,
            cluster_cpu_util: total_cpu_usage / (total_cpu_ceiling + EPSILON),
            cluster_mem_util: total_mem_usage / (total_mem_ceiling + EPSILON),
            degraded_readings,
        }
    }

    async fn sample_tenant(&self, namespace: &str) -> TenantSample {
        let mut sample = TenantSample::default();

        let pods = match self.ops.list_pods(namespace).await {
            Ok(pods) => pods,
            Err(e) => {
                warn!(namespace = %namespace, error = %e, "Failed to list pods, tenant observed as empty");
                sample.degraded += 1;
                return sample;
            }
        };

        let metrics = match self.ops.list_pod_metrics(namespace).await {
            Ok(records) => records,
            Err(e) => {
                warn!(namespace = %namespace, error = %e, "Failed to list pod metrics, usage degraded to zero");
                sample.degraded += 1;
                Vec::new()
            }
        };

        let by_pod: HashMap<&str, &PodUsage> =
            metrics.iter().map(|m| (m.pod_name.as_str(), m)).collect();

        for pod in &pods {
            match by_pod.get(pod.name.as_str()) {
                Some(record) => {
                    for container in &record.containers {
                        match try_parse_cpu_usage(&container.cpu) {
                            Some(v) => sample.cpu_usage += v,
                            None => sample.degraded += 1,
                        }
                        match try_parse_memory_usage(&container.memory) {
                            Some(v) => sample.mem_usage += v,
                            None => sample.degraded += 1,
                        }
                    }
                }
                // A pod the metrics pipeline has not caught up with yet
                // contributes zero usage, not an error.
                None => sample.degraded += 1,
            }

            for container in &pod.containers {
                // An absent request is a legitimate zero; only a present
                // but malformed one counts as degraded.
                if let Some(cpu) = container.cpu_request.as_deref() {
                    match try_parse_cpu_request(cpu) {
                        Some(v) => sample.cpu_allocated += v,
                        None => sample.degraded += 1,
                    }
                }
                if let Some(mem) = container.memory_request.as_deref() {
                    match try_parse_memory_request(mem) {
                        Some(v) => sample.mem_allocated += v,
                        None => sample.degraded += 1,
                    }
                }
            }

            sample.replicas += 1;
        }

        sample
    }
}
