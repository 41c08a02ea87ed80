//! Coarse-grained scale safety net
//!
//! A periodic monitor independent of the main control loop: every fixed
//! interval it samples a coarse usage signal and issues a binary
//! scale-up/scale-down decision for a single named workload when the
//! usage threshold is crossed. The iteration body returns a `Result`
//! that the loop logs and swallows; the interval fires regardless of
//! outcome, and a shutdown signal is checked at the top of each
//! iteration.
//!
//! This path and the fine-grained per-tenant loop are intended as
//! mutually exclusive control paths; nothing coordinates their patches
//! if both are enabled against overlapping workloads.

use crate::observability::{ControllerMetrics, StructuredLogger};
use crate::platform::{ClusterOps, PlatformError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{info, warn};

/// Configuration for the scale monitor.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub interval: Duration,
    /// Namespace of the single workload this safety net watches.
    pub namespace: String,
    pub workload: String,
    /// Usage percentage above which the workload scales out.
    pub usage_threshold_percent: f64,
    pub high_replicas: u32,
    pub low_replicas: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            namespace: "network-hub".to_string(),
            workload: "xr-application".to_string(),
            usage_threshold_percent: 80.0,
            high_replicas: 2,
            low_replicas: 1,
        }
    }
}

/// One coarse usage sample, in percent of capacity.
#[derive(Debug, Clone, Copy)]
pub struct UsageSample {
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

/// Source of the coarse usage signal. Behind a trait so tests can feed
/// deterministic samples.
pub trait UsageSignal: Send {
    fn sample(&mut self) -> UsageSample;
}

/// Uniformly random usage in [0, 100)% — a stand-in signal for
/// demonstration clusters without a wired metrics pipeline.
pub struct SimulatedUsage {
    rng: StdRng,
}

impl SimulatedUsage {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for SimulatedUsage {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageSignal for SimulatedUsage {
    fn sample(&mut self) -> UsageSample {
        UsageSample {
            cpu_percent: self.rng.gen_range(0.0..100.0),
            memory_percent: self.rng.gen_range(0.0..100.0),
        }
    }
}

/// The binary decision: either usage axis over the threshold scales
/// out, otherwise scale back in.
pub fn scale_decision(sample: UsageSample, config: &MonitorConfig) -> u32 {
    if sample.cpu_percent > config.usage_threshold_percent
        || sample.memory_percent > config.usage_threshold_percent
    {
        config.high_replicas
    } else {
        config.low_replicas
    }
}

/// Timer-driven scale monitor task.
pub struct ScaleMonitor {
    ops: Arc<dyn ClusterOps>,
    signal: Box<dyn UsageSignal>,
    config: MonitorConfig,
    metrics: ControllerMetrics,
    logger: StructuredLogger,
}

impl ScaleMonitor {
    pub fn new(
        ops: Arc<dyn ClusterOps>,
        signal: Box<dyn UsageSignal>,
        config: MonitorConfig,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            ops,
            signal,
            config,
            metrics: ControllerMetrics::new(),
            logger,
        }
    }

    /// Run until the shutdown signal fires. Iteration failures are
    /// logged and never terminate the loop.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            namespace = %self.config.namespace,
            workload = %self.config.workload,
            "Starting scale monitor"
        );

        let mut ticker = interval(self.config.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.tick_once().await {
                        warn!(error = %e, "Scale monitor iteration failed");
                    }
                }
                _ = shutdown.recv() => {
                    info!("Shutting down scale monitor");
                    break;
                }
            }
        }
    }

    async fn tick_once(&mut self) -> Result<(), PlatformError> {
        let sample = self.signal.sample();
        let replicas = scale_decision(sample, &self.config);

        self.logger.log_scale_decision(
            &self.config.namespace,
            &self.config.workload,
            sample.cpu_percent,
            sample.memory_percent,
            replicas,
        );
        self.metrics.inc_scale_decisions();

        self.ops
            .patch_workload_replicas(&self.config.namespace, &self.config.workload, replicas)
            .await
    }
}
