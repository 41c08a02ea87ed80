//! Controller configuration

use anyhow::Result;
use controller_lib::env::EnvConfig;
use controller_lib::monitor::MonitorConfig;
use controller_lib::quota::QuotaSelection;
use serde::Deserialize;
use std::time::Duration;

/// Controller configuration, loaded from `CONTROLLER_*` environment
/// variables with serde defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct ControllerConfig {
    /// Identifier carried in every structured log record
    #[serde(default = "default_controller_id")]
    pub controller_id: String,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Number of tenants; namespaces follow the customer-<letter> rule
    #[serde(default = "default_tenant_count")]
    pub tenant_count: usize,

    /// Default CPU ceiling in cores when a namespace has no quota
    #[serde(default = "default_cpu_ceiling")]
    pub default_cpu_ceiling_cores: f64,

    /// Default memory ceiling in GiB when a namespace has no quota
    #[serde(default = "default_mem_ceiling")]
    pub default_mem_ceiling_gib: f64,

    /// Replica bound per tenant workload
    #[serde(default = "default_max_replicas")]
    pub max_replicas_per_tenant: u32,

    /// Seconds between control steps
    #[serde(default = "default_step_interval")]
    pub step_interval_secs: u64,

    /// Quota selection when a namespace carries multiple quota objects
    #[serde(default)]
    pub quota_selection: QuotaSelection,

    /// Coarse scale monitor; off by default because it and the control
    /// loop are mutually exclusive control paths
    #[serde(default)]
    pub monitor_enabled: bool,

    #[serde(default = "default_monitor_namespace")]
    pub monitor_namespace: String,

    #[serde(default = "default_monitor_workload")]
    pub monitor_workload: String,

    #[serde(default = "default_monitor_interval")]
    pub monitor_interval_secs: u64,
}

fn default_controller_id() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "tenant-controller".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_tenant_count() -> usize {
    1
}

fn default_cpu_ceiling() -> f64 {
    8.0
}

fn default_mem_ceiling() -> f64 {
    16.0
}

fn default_max_replicas() -> u32 {
    5
}

fn default_step_interval() -> u64 {
    30
}

fn default_monitor_namespace() -> String {
    "network-hub".to_string()
}

fn default_monitor_workload() -> String {
    "xr-application".to_string()
}

fn default_monitor_interval() -> u64 {
    60
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            controller_id: default_controller_id(),
            api_port: default_api_port(),
            tenant_count: default_tenant_count(),
            default_cpu_ceiling_cores: default_cpu_ceiling(),
            default_mem_ceiling_gib: default_mem_ceiling(),
            max_replicas_per_tenant: default_max_replicas(),
            step_interval_secs: default_step_interval(),
            quota_selection: QuotaSelection::default(),
            monitor_enabled: false,
            monitor_namespace: default_monitor_namespace(),
            monitor_workload: default_monitor_workload(),
            monitor_interval_secs: default_monitor_interval(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("CONTROLLER"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_default())
    }

    pub fn env_config(&self) -> EnvConfig {
        EnvConfig {
            controller_id: self.controller_id.clone(),
            tenant_count: self.tenant_count,
            default_cpu_ceiling_cores: self.default_cpu_ceiling_cores,
            default_mem_ceiling_gib: self.default_mem_ceiling_gib,
            max_replicas_per_tenant: self.max_replicas_per_tenant,
            quota_selection: self.quota_selection,
        }
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            interval: Duration::from_secs(self.monitor_interval_secs),
            namespace: self.monitor_namespace.clone(),
            workload: self.monitor_workload.clone(),
            ..Default::default()
        }
    }

    pub fn step_interval(&self) -> Duration {
        Duration::from_secs(self.step_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_a_single_tenant() {
        let config = ControllerConfig::default();
        assert_eq!(config.tenant_count, 1);
        assert_eq!(config.default_cpu_ceiling_cores, 8.0);
        assert_eq!(config.default_mem_ceiling_gib, 16.0);
        assert_eq!(config.max_replicas_per_tenant, 5);
        assert!(!config.monitor_enabled);
    }

    #[test]
    fn env_config_mirrors_controller_config() {
        let config = ControllerConfig {
            tenant_count: 3,
            ..Default::default()
        };
        let env = config.env_config();
        assert_eq!(env.tenant_count, 3);
        assert_eq!(env.max_replicas_per_tenant, 5);
    }
}
