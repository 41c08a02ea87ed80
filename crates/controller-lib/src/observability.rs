//! Observability infrastructure for the tenant controller
//!
//! Provides:
//! - Prometheus metrics (step/apply latency, reward, cluster
//!   utilization, degraded readings, patch outcomes)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge, register_histogram, register_int_counter, Gauge, Histogram, IntCounter,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for control-cycle latencies (in seconds). Cycles
/// are dominated by platform round-trips, so buckets skew high.
const LATENCY_BUCKETS: &[f64] = &[0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ControllerMetricsInner> = OnceLock::new();

struct ControllerMetricsInner {
    step_latency_seconds: Histogram,
    apply_latency_seconds: Histogram,
    reward: Gauge,
    cluster_cpu_utilization: Gauge,
    cluster_mem_utilization: Gauge,
    degraded_readings: IntCounter,
    workloads_patched: IntCounter,
    patch_failures: IntCounter,
    scale_decisions: IntCounter,
}

impl ControllerMetricsInner {
    fn new() -> Self {
        Self {
            step_latency_seconds: register_histogram!(
                "tenant_controller_step_latency_seconds",
                "Time spent per control step (apply + re-observe + score)",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register step_latency_seconds"),

            apply_latency_seconds: register_histogram!(
                "tenant_controller_apply_latency_seconds",
                "Time spent patching workloads for one step",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register apply_latency_seconds"),

            reward: register_gauge!(
                "tenant_controller_reward",
                "Reward of the most recent observation (non-positive cost)"
            )
            .expect("Failed to register reward"),

            cluster_cpu_utilization: register_gauge!(
                "tenant_controller_cluster_cpu_utilization",
                "Total tenant CPU usage over total quota ceilings"
            )
            .expect("Failed to register cluster_cpu_utilization"),

            cluster_mem_utilization: register_gauge!(
                "tenant_controller_cluster_mem_utilization",
                "Total tenant memory usage over total quota ceilings"
            )
            .expect("Failed to register cluster_mem_utilization"),

            degraded_readings: register_int_counter!(
                "tenant_controller_degraded_readings_total",
                "Readings silently zero-filled: parse failures, missing metrics records, metrics listing failures"
            )
            .expect("Failed to register degraded_readings"),

            workloads_patched: register_int_counter!(
                "tenant_controller_workloads_patched_total",
                "Successful workload patch operations"
            )
            .expect("Failed to register workloads_patched"),

            patch_failures: register_int_counter!(
                "tenant_controller_patch_failures_total",
                "Failed workload patch operations (skipped, not retried)"
            )
            .expect("Failed to register patch_failures"),

            scale_decisions: register_int_counter!(
                "tenant_controller_scale_decisions_total",
                "Coarse scale decisions issued by the periodic monitor"
            )
            .expect("Failed to register scale_decisions"),
        }
    }
}

/// Controller metrics for Prometheus exposition.
///
/// A lightweight handle to the global metrics instance; clones share
/// the same underlying metrics.
#[derive(Clone)]
pub struct ControllerMetrics {
    _private: (),
}

impl Default for ControllerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ControllerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ControllerMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_step_latency(&self, duration_secs: f64) {
        self.inner().step_latency_seconds.observe(duration_secs);
    }

    pub fn observe_apply_latency(&self, duration_secs: f64) {
        self.inner().apply_latency_seconds.observe(duration_secs);
    }

    pub fn set_reward(&self, reward: f64) {
        self.inner().reward.set(reward);
    }

    pub fn set_cluster_utilization(&self, cpu: f64, memory: f64) {
        self.inner().cluster_cpu_utilization.set(cpu);
        self.inner().cluster_mem_utilization.set(memory);
    }

    pub fn add_degraded_readings(&self, count: u64) {
        self.inner().degraded_readings.inc_by(count);
    }

    pub fn add_patch_outcome(&self, patched: u32, failed: u32) {
        self.inner().workloads_patched.inc_by(u64::from(patched));
        self.inner().patch_failures.inc_by(u64::from(failed));
    }

    pub fn inc_scale_decisions(&self) {
        self.inner().scale_decisions.inc();
    }
}

/// Structured logger for controller events.
///
/// Consistent event-tagged records for steps, scale decisions, and
/// lifecycle transitions.
#[derive(Clone)]
pub struct StructuredLogger {
    controller_id: String,
}

impl StructuredLogger {
    pub fn new(controller_id: impl Into<String>) -> Self {
        Self {
            controller_id: controller_id.into(),
        }
    }

    /// Log completion of one control step.
    #[allow(clippy::too_many_arguments)]
    pub fn log_step(
        &self,
        step: u64,
        reward: f64,
        cluster_cpu_util: f64,
        cluster_mem_util: f64,
        degraded_readings: u64,
        workloads_patched: u32,
        patch_failures: u32,
    ) {
        if degraded_readings > 0 {
            warn!(
                event = "control_step",
                controller = %self.controller_id,
                step = step,
                reward = reward,
                cluster_cpu_util = cluster_cpu_util,
                cluster_mem_util = cluster_mem_util,
                degraded_readings = degraded_readings,
                workloads_patched = workloads_patched,
                patch_failures = patch_failures,
                "Control step completed with degraded readings"
            );
        } else {
            info!(
                event = "control_step",
                controller = %self.controller_id,
                step = step,
                reward = reward,
                cluster_cpu_util = cluster_cpu_util,
                cluster_mem_util = cluster_mem_util,
                workloads_patched = workloads_patched,
                patch_failures = patch_failures,
                "Control step completed"
            );
        }
    }

    /// Log a coarse scale decision from the periodic monitor.
    pub fn log_scale_decision(
        &self,
        namespace: &str,
        workload: &str,
        cpu_percent: f64,
        memory_percent: f64,
        replicas: u32,
    ) {
        info!(
            event = "scale_decision",
            controller = %self.controller_id,
            namespace = %namespace,
            workload = %workload,
            cpu_percent = cpu_percent,
            memory_percent = memory_percent,
            replicas = replicas,
            "Coarse scale decision issued"
        );
    }

    /// Log a refreshed quota ceiling for one tenant.
    pub fn log_ceiling_refresh(&self, namespace: &str, cpu_cores: f64, mem_gib: f64) {
        info!(
            event = "ceiling_refresh",
            controller = %self.controller_id,
            namespace = %namespace,
            cpu_ceiling_cores = cpu_cores,
            mem_ceiling_gib = mem_gib,
            "Tenant ceilings resolved"
        );
    }

    /// Log controller startup
    pub fn log_startup(&self, version: &str, tenant_count: usize) {
        info!(
            event = "controller_started",
            controller = %self.controller_id,
            version = %version,
            tenant_count = tenant_count,
            "Tenant controller started"
        );
    }

    /// Log controller shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "controller_shutdown",
            controller = %self.controller_id,
            reason = %reason,
            "Tenant controller shutting down"
        );
    }
}
