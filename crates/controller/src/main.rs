//! Tenant controller - closed-loop multi-tenant resource controller
//!
//! Observes per-tenant utilization, drives resource requests and
//! replica counts toward the utilization set-point, and exposes
//! health/metrics endpoints for the platform's probes.

use anyhow::{Context, Result};
use controller_lib::health::components;
use controller_lib::monitor::{ScaleMonitor, SimulatedUsage};
use controller_lib::platform::KubeCluster;
use controller_lib::{
    HealthRegistry, Policy, SetPointPolicy, StructuredLogger, TenantEnv,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const CONTROLLER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting tenant-controller");

    let config = config::ControllerConfig::load()?;
    info!(
        controller_id = %config.controller_id,
        tenant_count = config.tenant_count,
        "Controller configured"
    );

    // One client for the whole process; construction failure surfaces
    // here rather than on every platform call.
    let cluster = Arc::new(
        KubeCluster::connect()
            .await
            .context("Failed to construct platform client")?,
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::PLATFORM).await;
    health_registry.register(components::STATE_BUILDER).await;
    health_registry.register(components::ACTION_APPLIER).await;

    let logger = StructuredLogger::new(&config.controller_id);
    logger.log_startup(CONTROLLER_VERSION, config.tenant_count);

    let env = TenantEnv::new(cluster.clone(), config.env_config()).await;

    let app_state = Arc::new(api::AppState::new(health_registry.clone()));
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    let (shutdown_tx, _) = broadcast::channel(1);

    if config.monitor_enabled {
        warn!("Scale monitor enabled alongside the control loop; these are unsupported as concurrent control paths over overlapping workloads");
        health_registry.register(components::MONITOR).await;

        let monitor = ScaleMonitor::new(
            cluster.clone(),
            Box::new(SimulatedUsage::new()),
            config.monitor_config(),
            logger.clone(),
        );
        tokio::spawn(monitor.run(shutdown_tx.subscribe()));
    }

    health_registry.set_ready(true).await;

    let loop_handle = tokio::spawn(run_control_loop(
        env,
        config.step_interval(),
        health_registry.clone(),
        shutdown_tx.subscribe(),
    ));

    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    let _ = shutdown_tx.send(());

    let _ = loop_handle.await;
    api_handle.abort();
    info!("Shutting down");

    Ok(())
}

/// Drive the environment with the rule-based set-point policy until
/// shutdown. Step failures degrade health and back off one interval;
/// the loop itself never exits on error.
async fn run_control_loop(
    mut env: TenantEnv,
    step_interval: Duration,
    health_registry: HealthRegistry,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut policy = SetPointPolicy::default();
    let mut ticker = tokio::time::interval(step_interval);

    let mut observation = env.reset().await;
    info!(
        observation_len = observation.len(),
        "Control loop initialized"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let action = policy.act(&observation);
                match env.step(action).await {
                    Ok(step) => {
                        if step.info.patch_failures > 0 {
                            health_registry
                                .set_degraded(
                                    components::ACTION_APPLIER,
                                    format!("{} patch failures last step", step.info.patch_failures),
                                )
                                .await;
                        } else {
                            health_registry.set_healthy(components::ACTION_APPLIER).await;
                        }

                        if step.info.degraded_readings > 0 {
                            health_registry
                                .set_degraded(
                                    components::STATE_BUILDER,
                                    format!("{} degraded readings last step", step.info.degraded_readings),
                                )
                                .await;
                        } else {
                            health_registry.set_healthy(components::STATE_BUILDER).await;
                        }

                        observation = step.observation;
                    }
                    Err(e) => {
                        // Shape/phase errors are programming errors in the
                        // driving loop; log and re-observe rather than exit.
                        warn!(error = %e, "Control step rejected, re-observing");
                        observation = env.reset().await;
                    }
                }
            }
            _ = shutdown.recv() => {
                info!("Shutting down control loop");
                break;
            }
        }
    }
}
