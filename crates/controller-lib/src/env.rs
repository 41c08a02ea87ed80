//! Control loop / environment interface
//!
//! Ties the state builder, action applier, and reward evaluator into
//! the standard reset/step contract any decision policy can drive:
//! `reset` re-observes and returns the observation; `step` clamps the
//! action, applies it per tenant, re-observes, and scores.
//!
//! This is an infinite-horizon control problem: `done` is always false
//! and callers impose their own step budget. Running more than one
//! environment against the same tenant set is not supported; patches
//! are best-effort with no cross-instance coordination.

use crate::action::{ActionApplier, ApplyOutcome};
use crate::models::{Action, Observation, Tenant, COMPONENTS_PER_TENANT};
use crate::observability::{ControllerMetrics, StructuredLogger};
use crate::platform::ClusterOps;
use crate::quota::{QuotaResolver, QuotaSelection};
use crate::reward;
use crate::state::StateBuilder;
use std::sync::Arc;
use thiserror::Error;
use tokio::time::Instant;

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("step called before reset")]
    NotReset,

    #[error("action has {got} components, expected {expected}")]
    ActionShape { expected: usize, got: usize },
}

/// Construction parameters for the environment.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub controller_id: String,
    pub tenant_count: usize,
    /// Default ceilings when a namespace has no quota object.
    pub default_cpu_ceiling_cores: f64,
    pub default_mem_ceiling_gib: f64,
    pub max_replicas_per_tenant: u32,
    pub quota_selection: QuotaSelection,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            controller_id: "tenant-controller".to_string(),
            tenant_count: 1,
            default_cpu_ceiling_cores: 8.0,
            default_mem_ceiling_gib: 16.0,
            max_replicas_per_tenant: 5,
            quota_selection: QuotaSelection::FirstMatch,
        }
    }
}

/// Per-step diagnostics surfaced alongside the observation.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepInfo {
    pub degraded_readings: u64,
    pub workloads_patched: u32,
    pub patch_failures: u32,
}

/// Result of one control step.
#[derive(Debug, Clone)]
pub struct Step {
    pub observation: Observation,
    pub reward: f64,
    /// Always false: the environment never signals natural termination.
    pub done: bool,
    pub info: StepInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Ready,
    Stepping,
}

/// The closed-loop controller environment.
pub struct TenantEnv {
    tenants: Vec<Tenant>,
    state: StateBuilder,
    applier: ActionApplier,
    quotas: QuotaResolver,
    metrics: ControllerMetrics,
    logger: StructuredLogger,
    phase: Phase,
    step_count: u64,
}

impl TenantEnv {
    /// Build the environment over an injected platform capability and
    /// resolve initial ceilings for every tenant namespace.
    pub async fn new(ops: Arc<dyn ClusterOps>, config: EnvConfig) -> Self {
        let tenants = (0..config.tenant_count)
            .map(|i| Tenant {
                namespace: Tenant::namespace_for(i),
                cpu_ceiling_cores: config.default_cpu_ceiling_cores,
                mem_ceiling_gib: config.default_mem_ceiling_gib,
                max_replicas: config.max_replicas_per_tenant,
            })
            .collect();

        let mut env = Self {
            tenants,
            state: StateBuilder::new(ops.clone()),
            applier: ActionApplier::new(
                ops.clone(),
                QuotaResolver::new(ops.clone(), config.quota_selection),
            ),
            quotas: QuotaResolver::new(ops, config.quota_selection),
            metrics: ControllerMetrics::new(),
            logger: StructuredLogger::new(config.controller_id),
            phase: Phase::Ready,
            step_count: 0,
        };

        env.refresh_ceilings().await;
        env
    }

    pub fn tenants(&self) -> &[Tenant] {
        &self.tenants
    }

    /// Expected action vector length: 3 components per tenant.
    pub fn action_len(&self) -> usize {
        self.tenants.len() * COMPONENTS_PER_TENANT
    }

    /// Re-resolve quota ceilings for every tenant, keeping configured
    /// defaults where the platform has no opinion.
    pub async fn refresh_ceilings(&mut self) {
        for tenant in &mut self.tenants {
            let ceilings = self.quotas.resolve(&tenant.namespace).await;
            if let Some(cpu) = ceilings.cpu_cores {
                tenant.cpu_ceiling_cores = cpu;
            }
            if let Some(mem) = ceilings.mem_gib {
                tenant.mem_ceiling_gib = mem;
            }
            self.logger.log_ceiling_refresh(
                &tenant.namespace,
                tenant.cpu_ceiling_cores,
                tenant.mem_ceiling_gib,
            );
        }
    }

    /// Observe current state and enter the stepping phase.
    pub async fn reset(&mut self) -> Observation {
        let observation = self.state.observe(&self.tenants).await;
        self.metrics
            .add_degraded_readings(observation.degraded_readings);
        self.phase = Phase::Stepping;
        observation
    }

    /// Apply an action, re-observe, and score.
    pub async fn step(&mut self, action: Action) -> Result<Step, EnvError> {
        if self.phase != Phase::Stepping {
            return Err(EnvError::NotReset);
        }
        if action.len() != self.action_len() {
            return Err(EnvError::ActionShape {
                expected: self.action_len(),
                got: action.len(),
            });
        }

        let started = Instant::now();
        let action = action.clamped();

        let apply_started = Instant::now();
        let mut outcome = ApplyOutcome::default();
        for (i, tenant) in self.tenants.iter().enumerate() {
            let tenant_outcome = self.applier.apply(tenant, &action.tenant(i)).await;
            outcome.patched += tenant_outcome.patched;
            outcome.failed += tenant_outcome.failed;
        }
        self.metrics
            .observe_apply_latency(apply_started.elapsed().as_secs_f64());

        let observation = self.state.observe(&self.tenants).await;
        let reward = reward::score(&observation);

        self.step_count += 1;
        let info = StepInfo {
            degraded_readings: observation.degraded_readings,
            workloads_patched: outcome.patched,
            patch_failures: outcome.failed,
        };

        self.metrics
            .observe_step_latency(started.elapsed().as_secs_f64());
        self.metrics.set_reward(reward);
        self.metrics
            .set_cluster_utilization(observation.cluster_cpu_util, observation.cluster_mem_util);
        self.metrics.add_degraded_readings(info.degraded_readings);
        self.metrics.add_patch_outcome(outcome.patched, outcome.failed);

        self.logger.log_step(
            self.step_count,
            reward,
            observation.cluster_cpu_util,
            observation.cluster_mem_util,
            info.degraded_readings,
            info.workloads_patched,
            info.patch_failures,
        );

        Ok(Step {
            observation,
            reward,
            done: false,
            info,
        })
    }
}
