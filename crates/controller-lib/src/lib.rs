//! Controller library for multi-tenant resource management
//!
//! This crate provides the core functionality for:
//! - Resource quantity parsing and normalization
//! - A typed capability interface over the orchestration platform
//! - Quota ceiling resolution with configurable selection
//! - Observation building and utilization scoring
//! - Bounded action application against live workloads
//! - The reset/step environment contract and the coarse scale monitor
//! - Health checks and observability

pub mod action;
pub mod env;
pub mod health;
pub mod models;
pub mod monitor;
pub mod observability;
pub mod platform;
pub mod policy;
pub mod quota;
pub mod reward;
pub mod state;
pub mod units;

pub use env::{EnvConfig, EnvError, Step, StepInfo, TenantEnv};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::{Action, Observation, Tenant, TenantAction, TenantUtilization};
pub use observability::{ControllerMetrics, StructuredLogger};
pub use policy::{Policy, SetPointPolicy};
