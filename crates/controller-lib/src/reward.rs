//! Utilization scoring
//!
//! Pure functions of the observation. The score is a strictly
//! non-positive cost: zero only when every tenant sits exactly on the
//! set-point and the cluster is within capacity, more negative as
//! ratios drift or the cluster overcommits.

use crate::models::Observation;

/// Target utilization ratio the controller steers toward.
pub const SET_POINT: f64 = 0.8;

/// Squared distance of each tenant's CPU and memory ratios from the
/// set-point, summed over tenants.
pub fn tenant_penalty(observation: &Observation) -> f64 {
    observation
        .tenants
        .iter()
        .map(|t| (t.cpu_ratio - SET_POINT).powi(2) + (t.mem_ratio - SET_POINT).powi(2))
        .sum()
}

/// Penalty for exceeding full cluster capacity. Under-utilization is
/// not penalized here; the per-tenant term already pulls upward.
pub fn cluster_penalty(observation: &Observation) -> f64 {
    (observation.cluster_cpu_util - 1.0).max(0.0).powi(2)
        + (observation.cluster_mem_util - 1.0).max(0.0).powi(2)
}

/// The reward signal: negative total penalty, optimum 0.
pub fn score(observation: &Observation) -> f64 {
    -(tenant_penalty(observation) + cluster_penalty(observation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TenantUtilization;

    fn obs(ratios: &[(f64, f64)], cluster_cpu: f64, cluster_mem: f64) -> Observation {
        Observation {
            tenants: ratios
                .iter()
                .map(|&(cpu_ratio, mem_ratio)| TenantUtilization {
                    cpu_ratio,
                    mem_ratio,
                    replica_ratio: 0.5,
                })
                .collect(),
            cluster_cpu_util: cluster_cpu,
            cluster_mem_util: cluster_mem,
            degraded_readings: 0,
        }
    }

    #[test]
    fn reward_is_zero_at_the_set_point() {
        let observation = obs(&[(0.8, 0.8), (0.8, 0.8)], 0.9, 1.0);
        assert_eq!(score(&observation), 0.0);
    }

    #[test]
    fn reward_decreases_as_ratios_drift() {
        let on_target = score(&obs(&[(0.8, 0.8)], 0.5, 0.5));
        let above = score(&obs(&[(1.0, 0.8)], 0.5, 0.5));
        let below = score(&obs(&[(0.8, 0.5)], 0.5, 0.5));
        let far = score(&obs(&[(1.4, 0.8)], 0.5, 0.5));

        assert!(above < on_target);
        assert!(below < on_target);
        assert!(far < above);
    }

    #[test]
    fn reward_is_never_positive() {
        for ratios in [(0.0, 0.0), (0.8, 0.8), (2.5, 0.1)] {
            assert!(score(&obs(&[ratios], 1.5, 0.2)) <= 0.0);
        }
    }

    #[test]
    fn cluster_penalty_only_on_overload() {
        assert_eq!(cluster_penalty(&obs(&[], 0.3, 1.0)), 0.0);

        let overloaded = obs(&[], 1.5, 1.2);
        let expected = 0.5_f64.powi(2) + 0.2_f64.powi(2);
        assert!((cluster_penalty(&overloaded) - expected).abs() < 1e-12);
    }

    #[test]
    fn penalties_sum_over_tenants() {
        let one = tenant_penalty(&obs(&[(1.0, 0.8)], 0.5, 0.5));
        let two = tenant_penalty(&obs(&[(1.0, 0.8), (1.0, 0.8)], 0.5, 0.5));
        assert!((two - 2.0 * one).abs() < 1e-12);
    }
}
