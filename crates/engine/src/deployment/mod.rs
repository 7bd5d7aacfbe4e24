//! Deployed flows: the runtime registry that gates execution and
//! aggregates per-deployment health and performance.

mod deployed;
mod registry;

pub use self::deployed::{
    DeployedFlow, DeploymentStats, DeploymentStatus, HealthStatus, RuntimeStatus,
};
pub use self::registry::DeploymentRegistry;
