//! Decision policy seam
//!
//! The environment contract is the same whether the policy is learned,
//! heuristic, or rule-based; this module defines the seam and ships a
//! proportional rule-based default so the controller runs without any
//! external decision-maker.

use crate::models::{Action, Observation};
use crate::reward::SET_POINT;

/// Anything that can turn an observation into a bounded action.
pub trait Policy: Send {
    fn act(&mut self, observation: &Observation) -> Action;
}

/// Proportional controller toward the utilization set-point.
///
/// A tenant running above the set-point gets more resources (positive
/// delta, scaled by distance), one running below gives some back.
/// Replicas move only at the extremes: overcommitted on both axes
/// scales out, deeply idle scales in.
#[derive(Debug, Clone)]
pub struct SetPointPolicy {
    /// Proportional gain applied to the ratio error.
    pub gain: f64,
}

impl Default for SetPointPolicy {
    fn default() -> Self {
        Self { gain: 0.5 }
    }
}

impl Policy for SetPointPolicy {
    fn act(&mut self, observation: &Observation) -> Action {
        let mut components = Vec::with_capacity(observation.tenants.len() * 3);

        for tenant in &observation.tenants {
            let delta_cpu = ((tenant.cpu_ratio - SET_POINT) * self.gain).clamp(-1.0, 1.0);
            let delta_mem = ((tenant.mem_ratio - SET_POINT) * self.gain).clamp(-1.0, 1.0);

            let peak = tenant.cpu_ratio.max(tenant.mem_ratio);
            let delta_replicas = if tenant.cpu_ratio > 1.0 && tenant.mem_ratio > 1.0 {
                self.gain
            } else if peak < SET_POINT / 2.0 {
                -self.gain
            } else {
                0.0
            };

            components.push(delta_cpu);
            components.push(delta_mem);
            components.push(delta_replicas);
        }

        Action::new(components)
    }
}
