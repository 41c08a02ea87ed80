//! Core data models for the tenant controller

use serde::{Deserialize, Serialize};

/// Guard against division by zero when a tenant has no allocation yet.
pub const EPSILON: f64 = 1e-5;

/// Number of observation components contributed by each tenant.
pub const COMPONENTS_PER_TENANT: usize = 3;

/// One customer-scoped partition of the cluster, mapped to a namespace.
///
/// Ceilings come from the platform's quota objects when present and from
/// configured defaults otherwise. The tenant set is fixed at controller
/// construction; only the ceilings are refreshed afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub namespace: String,
    /// Maximum CPU the namespace may consume, in cores.
    pub cpu_ceiling_cores: f64,
    /// Maximum memory the namespace may consume, in GiB.
    pub mem_ceiling_gib: f64,
    /// Replica bound for every workload the tenant owns.
    pub max_replicas: u32,
}

impl Tenant {
    /// Deterministic namespace convention: tenant `i` lives in
    /// `customer-<letter>` where letter = 'a' + i.
    pub fn namespace_for(index: usize) -> String {
        debug_assert!(index < 26, "tenant index exceeds namespace convention");
        format!("customer-{}", (b'a' + index as u8) as char)
    }
}

/// Normalized utilization for a single tenant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TenantUtilization {
    /// Usage / allocated; non-negative, unbounded above.
    pub cpu_ratio: f64,
    /// Usage / allocated; non-negative, unbounded above.
    pub mem_ratio: f64,
    /// Pod count / max replicas.
    pub replica_ratio: f64,
}

/// A snapshot of cluster state consumed by a decision policy.
///
/// Immutable once produced; each control step replaces it with a fresh
/// one. Flattens to a vector of length `3 * tenants + 2`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub tenants: Vec<TenantUtilization>,
    /// Total usage across tenants over total quota ceilings.
    pub cluster_cpu_util: f64,
    pub cluster_mem_util: f64,
    /// Readings that failed to parse, pods with no metrics record, and
    /// metrics listing failures folded into this snapshot as zeros.
    pub degraded_readings: u64,
}

impl Observation {
    /// Flatten into the ordered numeric vector policies consume:
    /// `(cpu, mem, replicas)` per tenant, then the two cluster
    /// aggregates.
    pub fn to_vec(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.len());
        for t in &self.tenants {
            out.push(t.cpu_ratio);
            out.push(t.mem_ratio);
            out.push(t.replica_ratio);
        }
        out.push(self.cluster_cpu_util);
        out.push(self.cluster_mem_util);
        out
    }

    /// Length of the flattened vector: `3 * tenants + 2`.
    pub fn len(&self) -> usize {
        self.tenants.len() * COMPONENTS_PER_TENANT + 2
    }

    pub fn is_empty(&self) -> bool {
        false // the two cluster aggregates are always present
    }
}

/// Per-tenant slice of an action vector, each component in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TenantAction {
    pub delta_cpu: f64,
    pub delta_mem: f64,
    pub delta_replicas: f64,
}

/// The bounded numeric vector produced by a decision policy:
/// `(delta_cpu, delta_mem, delta_replicas)` per tenant.
///
/// Components outside [-1, 1] are tolerated on input and clamped before
/// use; a policy emitting garbage gets bounded behavior, not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct Action(Vec<f64>);

impl Action {
    pub fn new(components: Vec<f64>) -> Self {
        Self(components)
    }

    /// Clamp every component into [-1, 1].
    pub fn clamped(mut self) -> Self {
        for c in &mut self.0 {
            *c = c.clamp(-1.0, 1.0);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of complete per-tenant slices in the vector.
    pub fn tenant_count(&self) -> usize {
        self.0.len() / COMPONENTS_PER_TENANT
    }

    /// The `(delta_cpu, delta_mem, delta_replicas)` slice for tenant `i`.
    ///
    /// # Panics
    /// Panics if `i` is out of range; callers validate shape first.
    pub fn tenant(&self, i: usize) -> TenantAction {
        let base = i * COMPONENTS_PER_TENANT;
        TenantAction {
            delta_cpu: self.0[base],
            delta_mem: self.0[base + 1],
            delta_replicas: self.0[base + 2],
        }
    }

    pub fn components(&self) -> &[f64] {
        &self.0
    }
}
