//! Per-tenant quota ceiling resolution
//!
//! Reads `limits.cpu` / `limits.memory` from the namespace's quota
//! objects. Which object wins when a namespace carries several is
//! configurable: `FirstMatch` takes the first record the platform
//! enumerates (enumeration order is not guaranteed to be stable),
//! `MostRestrictive` takes the minimum of each limit across records.
//!
//! Resolution never fails: a platform error or an unparsable limit
//! resolves to an absent ceiling, and the caller falls back to its
//! configured defaults.

use crate::platform::{ClusterOps, QuotaRecord};
use crate::units::{try_parse_cpu_request, try_parse_memory_request};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

/// How to pick ceilings when a namespace has multiple quota objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuotaSelection {
    FirstMatch,
    MostRestrictive,
}

impl Default for QuotaSelection {
    fn default() -> Self {
        QuotaSelection::FirstMatch
    }
}

/// Resolved ceilings for one namespace. `None` means the platform has
/// no opinion and configured defaults apply.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QuotaCeilings {
    pub cpu_cores: Option<f64>,
    pub mem_gib: Option<f64>,
}

pub struct QuotaResolver {
    ops: Arc<dyn ClusterOps>,
    selection: QuotaSelection,
}

impl QuotaResolver {
    pub fn new(ops: Arc<dyn ClusterOps>, selection: QuotaSelection) -> Self {
        Self { ops, selection }
    }

    /// Fetch ceilings for a namespace. Never returns an error; a failed
    /// listing is logged and reported as absent ceilings.
    pub async fn resolve(&self, namespace: &str) -> QuotaCeilings {
        let quotas = match self.ops.list_quotas(namespace).await {
            Ok(quotas) => quotas,
            Err(e) => {
                warn!(namespace = %namespace, error = %e, "Failed to list quotas, using defaults");
                return QuotaCeilings::default();
            }
        };

        select_ceilings(&quotas, self.selection)
    }
}

fn record_ceilings(record: &QuotaRecord) -> QuotaCeilings {
    // An unparsable limit is treated as absent, not as a zero ceiling;
    // a zero ceiling would pin every request to the floor.
    QuotaCeilings {
        cpu_cores: record
            .cpu_limit
            .as_deref()
            .and_then(try_parse_cpu_request),
        mem_gib: record
            .memory_limit
            .as_deref()
            .and_then(try_parse_memory_request),
    }
}

fn select_ceilings(quotas: &[QuotaRecord], selection: QuotaSelection) -> QuotaCeilings {
    match selection {
        QuotaSelection::FirstMatch => quotas
            .first()
            .map(record_ceilings)
            .unwrap_or_default(),
        QuotaSelection::MostRestrictive => {
            let mut out = QuotaCeilings::default();
            for record in quotas {
                let ceilings = record_ceilings(record);
                out.cpu_cores = min_limit(out.cpu_cores, ceilings.cpu_cores);
                out.mem_gib = min_limit(out.mem_gib, ceilings.mem_gib);
            }
            out
        }
    }
}

fn min_limit(current: Option<f64>, candidate: Option<f64>) -> Option<f64> {
    match (current, candidate) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}
