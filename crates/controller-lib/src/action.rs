//! Action application
//!
//! Translates one tenant's bounded action slice into concrete resource
//! and replica patches against every workload in the tenant namespace.
//! Deltas scale against the tenant ceilings, results clamp into
//! [floor, ceiling], and requests and limits are written identically.
//!
//! Application is best-effort: a failed patch is logged and the
//! remaining workloads still get theirs. Partial application is
//! acceptable because the next control step re-observes live state and
//! self-corrects.

use crate::models::{Tenant, TenantAction};
use crate::platform::{ClusterOps, ContainerResources, PlatformError};
use crate::quota::QuotaResolver;
use crate::units::{parse_cpu_request, parse_memory_request};
use std::sync::Arc;
use tracing::{debug, warn};

/// Minimum request the controller will ever set, in cores / GiB.
/// Prevents a workload from being starved to zero.
pub const RESOURCE_FLOOR: f64 = 0.1;

/// What happened during one tenant's application pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApplyOutcome {
    /// Successful patch operations (resources and replicas separately).
    pub patched: u32,
    /// Failed patch operations, already logged.
    pub failed: u32,
}

pub struct ActionApplier {
    ops: Arc<dyn ClusterOps>,
    quotas: QuotaResolver,
}

/// New request value after applying a bounded delta scaled by the
/// tenant ceiling. The ceiling is raised to the floor first so the
/// clamp interval stays well-formed even for degenerate quotas.
pub fn bounded_request(current: f64, delta: f64, scale: f64, ceiling: f64) -> f64 {
    (current + delta * scale).clamp(RESOURCE_FLOOR, ceiling.max(RESOURCE_FLOOR))
}

/// New replica count after applying a bounded delta scaled by the
/// replica bound. Never drops below 1: scale-to-zero is out of scope.
pub fn bounded_replicas(current: u32, delta: f64, max_replicas: u32) -> u32 {
    let raw = (f64::from(current) + delta * f64::from(max_replicas)).round();
    (raw.max(1.0) as u32).min(max_replicas.max(1))
}

impl ActionApplier {
    pub fn new(ops: Arc<dyn ClusterOps>, quotas: QuotaResolver) -> Self {
        Self { ops, quotas }
    }

    /// Apply one tenant's action slice to every workload it owns.
    /// Side-effecting on the platform; never returns an error.
    pub async fn apply(&self, tenant: &Tenant, action: &TenantAction) -> ApplyOutcome {
        // Defense against a policy emitting out-of-range values.
        let delta_cpu = action.delta_cpu.clamp(-1.0, 1.0);
        let delta_mem = action.delta_mem.clamp(-1.0, 1.0);
        let delta_rep = action.delta_replicas.clamp(-1.0, 1.0);

        let mut outcome = ApplyOutcome::default();

        let workloads = match self.ops.list_workloads(&tenant.namespace).await {
            Ok(workloads) => workloads,
            Err(e) => {
                warn!(namespace = %tenant.namespace, error = %e, "Failed to list workloads, skipping cycle");
                outcome.failed += 1;
                return outcome;
            }
        };

        // Re-resolve ceilings so a quota tightened since startup binds
        // immediately; absent ceilings fall back to the tenant's.
        let ceilings = self.quotas.resolve(&tenant.namespace).await;
        let cpu_ceiling = ceilings.cpu_cores.unwrap_or(tenant.cpu_ceiling_cores);
        let mem_ceiling = ceilings.mem_gib.unwrap_or(tenant.mem_ceiling_gib);

        for workload in &workloads {
            let containers: Vec<ContainerResources> = workload
                .containers
                .iter()
                .map(|c| {
                    let current_cpu =
                        parse_cpu_request(c.cpu_request.as_deref().unwrap_or("0"));
                    let current_mem =
                        parse_memory_request(c.memory_request.as_deref().unwrap_or("0"));

                    let new_cpu =
                        bounded_request(current_cpu, delta_cpu, tenant.cpu_ceiling_cores, cpu_ceiling);
                    let new_mem =
                        bounded_request(current_mem, delta_mem, tenant.mem_ceiling_gib, mem_ceiling);

                    ContainerResources {
                        name: c.name.clone(),
                        cpu: format!("{}", new_cpu),
                        memory: format!("{}Gi", new_mem),
                    }
                })
                .collect();

            match self
                .ops
                .patch_workload_resources(&tenant.namespace, &workload.name, &containers)
                .await
            {
                Ok(()) => outcome.patched += 1,
                Err(e) => {
                    outcome.failed += 1;
                    log_patch_failure(&tenant.namespace, &workload.name, &e);
                }
            }

            let new_replicas = bounded_replicas(workload.replicas, delta_rep, tenant.max_replicas);
            match self
                .ops
                .patch_workload_replicas(&tenant.namespace, &workload.name, new_replicas)
                .await
            {
                Ok(()) => {
                    outcome.patched += 1;
                    debug!(
                        namespace = %tenant.namespace,
                        workload = %workload.name,
                        replicas = new_replicas,
                        "Replica count patched"
                    );
                }
                Err(e) => {
                    outcome.failed += 1;
                    log_patch_failure(&tenant.namespace, &workload.name, &e);
                }
            }
        }

        outcome
    }
}

fn log_patch_failure(namespace: &str, workload: &str, error: &PlatformError) {
    warn!(
        namespace = %namespace,
        workload = %workload,
        error = %error,
        "Patch failed, continuing with remaining workloads"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fake::{workload, FakeCluster, FakeNamespace, PatchRecord};
    use crate::quota::QuotaSelection;

    fn tenant() -> Tenant {
        Tenant {
            namespace: "customer-a".to_string(),
            cpu_ceiling_cores: 8.0,
            mem_ceiling_gib: 16.0,
            max_replicas: 5,
        }
    }

    fn applier(fake: Arc<FakeCluster>) -> ActionApplier {
        let quotas = QuotaResolver::new(fake.clone(), QuotaSelection::FirstMatch);
        ActionApplier::new(fake, quotas)
    }

    #[test]
    fn request_stays_within_floor_and_ceiling() {
        for delta in [-1.0, -0.5, 0.0, 0.5, 1.0] {
            for current in [0.0, 0.1, 4.0, 8.0, 20.0] {
                let v = bounded_request(current, delta, 8.0, 8.0);
                assert!(v >= RESOURCE_FLOOR && v <= 8.0, "delta={delta} current={current} v={v}");
            }
        }
    }

    #[test]
    fn request_concrete_scenario() {
        // 1 core + 0.5 * 8-core ceiling = 5 cores
        let v = bounded_request(1.0, 0.5, 8.0, 8.0);
        assert!((v - 5.0).abs() < 1e-9);
    }

    #[test]
    fn request_floor_applies_even_with_tiny_ceiling() {
        let v = bounded_request(0.0, -1.0, 8.0, 0.05);
        assert!((v - RESOURCE_FLOOR).abs() < 1e-9);
    }

    #[test]
    fn replicas_stay_within_one_and_max() {
        for delta in [-1.0, -0.4, 0.0, 0.4, 1.0] {
            for current in [1, 2, 5, 9] {
                let r = bounded_replicas(current, delta, 5);
                assert!((1..=5).contains(&r), "delta={delta} current={current} r={r}");
            }
        }
    }

    #[test]
    fn replicas_round_to_nearest() {
        // 2 + 0.3 * 5 = 3.5, rounds away from zero
        assert_eq!(bounded_replicas(2, 0.3, 5), 4);
        // 2 - 0.1 * 5 = 1.5, rounds to 2
        assert_eq!(bounded_replicas(2, -0.1, 5), 2);
    }

    #[tokio::test]
    async fn patches_every_workload_identically() {
        let fake = Arc::new(FakeCluster::new().with_namespace(
            "customer-a",
            FakeNamespace {
                workloads: vec![workload("web", 2, "1", "2Gi"), workload("worker", 1, "1", "2Gi")],
                ..Default::default()
            },
        ));

        let outcome = applier(fake.clone())
            .apply(
                &tenant(),
                &TenantAction {
                    delta_cpu: 0.5,
                    delta_mem: 0.0,
                    delta_replicas: 0.0,
                },
            )
            .await;

        assert_eq!(outcome.patched, 4);
        assert_eq!(outcome.failed, 0);

        let resource_patches: Vec<_> = fake
            .patches()
            .into_iter()
            .filter_map(|p| match p {
                PatchRecord::Resources { containers, .. } => Some(containers),
                _ => None,
            })
            .collect();
        assert_eq!(resource_patches.len(), 2);
        for containers in resource_patches {
            assert_eq!(containers[0].cpu, "5");
            assert_eq!(containers[0].memory, "2Gi");
        }
    }

    #[tokio::test]
    async fn quota_ceiling_binds_over_tenant_default() {
        let fake = Arc::new(FakeCluster::new().with_namespace(
            "customer-a",
            FakeNamespace {
                workloads: vec![workload("web", 1, "1", "2Gi")],
                quotas: vec![crate::platform::QuotaRecord {
                    name: "quota".to_string(),
                    cpu_limit: Some("2".to_string()),
                    memory_limit: Some("4Gi".to_string()),
                }],
                ..Default::default()
            },
        ));

        applier(fake.clone())
            .apply(
                &tenant(),
                &TenantAction {
                    delta_cpu: 1.0,
                    delta_mem: 1.0,
                    delta_replicas: 0.0,
                },
            )
            .await;

        let patches = fake.patches();
        let containers = match &patches[0] {
            PatchRecord::Resources { containers, .. } => containers,
            other => panic!("unexpected patch {other:?}"),
        };
        assert_eq!(containers[0].cpu, "2");
        assert_eq!(containers[0].memory, "4Gi");
    }

    #[tokio::test]
    async fn out_of_range_delta_is_clamped_not_rejected() {
        let fake = Arc::new(FakeCluster::new().with_namespace(
            "customer-a",
            FakeNamespace {
                workloads: vec![workload("web", 1, "1", "2Gi")],
                ..Default::default()
            },
        ));

        applier(fake.clone())
            .apply(
                &tenant(),
                &TenantAction {
                    delta_cpu: 10.0,
                    delta_mem: -10.0,
                    delta_replicas: 10.0,
                },
            )
            .await;

        let patches = fake.patches();
        let containers = match &patches[0] {
            PatchRecord::Resources { containers, .. } => containers,
            other => panic!("unexpected patch {other:?}"),
        };
        // clamped to +1.0 then bounded by the 8-core / floor limits
        assert_eq!(containers[0].cpu, "8");
        assert_eq!(containers[0].memory, "0.1Gi");

        match &patches[1] {
            PatchRecord::Replicas { replicas, .. } => assert_eq!(*replicas, 5),
            other => panic!("unexpected patch {other:?}"),
        }
    }

    #[tokio::test]
    async fn patch_failure_does_not_abort_the_pass() {
        let fake = Arc::new(FakeCluster::new().with_namespace(
            "customer-a",
            FakeNamespace {
                workloads: vec![workload("web", 1, "1", "2Gi")],
                fail_patch: true,
                ..Default::default()
            },
        ));

        let outcome = applier(fake.clone())
            .apply(
                &tenant(),
                &TenantAction {
                    delta_cpu: 0.1,
                    delta_mem: 0.1,
                    delta_replicas: 0.1,
                },
            )
            .await;

        assert_eq!(outcome.patched, 0);
        assert_eq!(outcome.failed, 2);
    }
}
