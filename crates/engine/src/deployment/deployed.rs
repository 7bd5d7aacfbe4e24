//! Deployed flow entity: execution gates, counters, error and health axes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::flow::{FlowConfiguration, IntegrationFlow};

/// Runtime status of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeStatus {
    Starting,
    Active,
    Inactive,
    Error,
    Stopping,
    Maintenance,
}

impl std::fmt::Display for RuntimeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Starting => write!(f, "starting"),
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
            Self::Error => write!(f, "error"),
            Self::Stopping => write!(f, "stopping"),
            Self::Maintenance => write!(f, "maintenance"),
        }
    }
}

/// Deployment lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Deploying,
    Deployed,
    Undeploying,
    Undeployed,
    Failed,
    Suspended,
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deploying => write!(f, "deploying"),
            Self::Deployed => write!(f, "deployed"),
            Self::Undeploying => write!(f, "undeploying"),
            Self::Undeployed => write!(f, "undeployed"),
            Self::Failed => write!(f, "failed"),
            Self::Suspended => write!(f, "suspended"),
        }
    }
}

/// Health as reported by the external health-check collaborator.
///
/// Deliberately a separate axis from [`RuntimeStatus`]: a deployment can be
/// ACTIVE yet WARNING at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Unhealthy,
    Unknown,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Warning => write!(f, "warning"),
            Self::Unhealthy => write!(f, "unhealthy"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Aggregate execution counters for one deployment.
///
/// Immutable value: [`DeploymentStats::record`] returns the updated copy
/// which the owner swaps wholesale, keeping concurrent-update races at the
/// swap boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentStats {
    pub total_executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    /// Exponentially smoothed: `avg' = avg*0.8 + duration*0.2`.
    pub average_execution_time_ms: f64,
    /// Uninterrupted failures since the last success.
    pub consecutive_failures: u32,
}

impl DeploymentStats {
    #[must_use]
    pub fn record(&self, duration_ms: u64, success: bool) -> Self {
        let average_execution_time_ms = if self.total_executions == 0 {
            duration_ms as f64
        } else {
            self.average_execution_time_ms * 0.8 + duration_ms as f64 * 0.2
        };
        Self {
            total_executions: self.total_executions + 1,
            successful_executions: self.successful_executions + u64::from(success),
            failed_executions: self.failed_executions + u64::from(!success),
            average_execution_time_ms,
            consecutive_failures: if success {
                0
            } else {
                self.consecutive_failures + 1
            },
        }
    }
}

/// Runtime-registry entry for an activated flow version.
///
/// Snapshots the flow's configuration at deploy time; later edits to the
/// source flow do not retroactively change a running deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployedFlow {
    pub id: Uuid,
    pub flow_id: Uuid,
    pub flow_version: u32,
    pub flow_name: String,
    /// Adapters bound at deploy time.
    pub adapter_ids: Vec<Uuid>,
    /// Frozen configuration copy.
    pub config: FlowConfiguration,

    pub execution_enabled: bool,
    pub runtime_status: RuntimeStatus,
    pub deployment_status: DeploymentStatus,

    #[serde(default)]
    pub stats: DeploymentStats,
    /// Executions currently in flight, gated against
    /// `config.max_parallel_executions`.
    pub active_executions: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error_at: Option<DateTime<Utc>>,

    pub health_status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_checked_at: Option<DateTime<Utc>>,

    pub deployed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeployedFlow {
    /// Snapshot a flow into a new deployment.
    ///
    /// Fails when the flow is inactive; inactive flows may not be deployed.
    pub fn from_flow(flow: &IntegrationFlow, adapter_ids: Vec<Uuid>) -> EngineResult<Self> {
        if !flow.can_deploy() {
            return Err(EngineError::Validation(format!(
                "Flow '{}' is inactive and may not be deployed",
                flow.name
            )));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            flow_id: flow.id,
            flow_version: flow.version,
            flow_name: flow.name.clone(),
            adapter_ids,
            config: flow.config.clone(),
            execution_enabled: true,
            runtime_status: RuntimeStatus::Starting,
            deployment_status: DeploymentStatus::Deploying,
            stats: DeploymentStats::default(),
            active_executions: 0,
            last_error_message: None,
            last_error_at: None,
            health_status: HealthStatus::Unknown,
            health_message: None,
            health_checked_at: None,
            deployed_at: now,
            updated_at: now,
        })
    }

    /// All three gates must agree: DEPLOYED, ACTIVE, and enabled.
    pub fn can_execute(&self) -> bool {
        self.deployment_status == DeploymentStatus::Deployed
            && self.runtime_status == RuntimeStatus::Active
            && self.execution_enabled
    }

    /// Finish the deploy transition: DEPLOYED + ACTIVE.
    pub fn mark_deployed(&mut self) {
        self.deployment_status = DeploymentStatus::Deployed;
        self.runtime_status = RuntimeStatus::Active;
        self.touch();
    }

    /// Begin teardown.
    pub fn mark_undeploying(&mut self) {
        self.deployment_status = DeploymentStatus::Undeploying;
        self.runtime_status = RuntimeStatus::Stopping;
        self.touch();
    }

    /// Finish teardown. The record remains for execution history.
    pub fn mark_undeployed(&mut self) {
        self.deployment_status = DeploymentStatus::Undeployed;
        self.runtime_status = RuntimeStatus::Inactive;
        self.execution_enabled = false;
        self.touch();
    }

    pub fn suspend(&mut self) {
        self.deployment_status = DeploymentStatus::Suspended;
        self.touch();
    }

    pub fn set_execution_enabled(&mut self, enabled: bool) {
        self.execution_enabled = enabled;
        self.touch();
    }

    /// Fold one finished execution into the aggregate counters.
    pub fn record_execution(&mut self, duration_ms: u64, success: bool) {
        self.stats = self.stats.record(duration_ms, success);
        self.touch();
    }

    /// Record a deployment-level error: last-error fields, failure streak,
    /// and a forced ERROR runtime status.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.last_error_message = Some(message.into());
        self.last_error_at = Some(Utc::now());
        self.stats = DeploymentStats {
            consecutive_failures: self.stats.consecutive_failures + 1,
            ..self.stats.clone()
        };
        self.runtime_status = RuntimeStatus::Error;
        self.touch();
    }

    /// Reset error fields. Restores ACTIVE only when currently in ERROR;
    /// any other runtime status is left alone.
    pub fn clear_errors(&mut self) {
        self.last_error_message = None;
        self.last_error_at = None;
        self.stats = DeploymentStats {
            consecutive_failures: 0,
            ..self.stats.clone()
        };
        if self.runtime_status == RuntimeStatus::Error {
            self.runtime_status = RuntimeStatus::Active;
        }
        self.touch();
    }

    /// Health is set by the external health checker, never derived here.
    pub fn update_health_status(&mut self, status: HealthStatus, message: Option<String>) {
        self.health_status = status;
        self.health_message = message;
        self.health_checked_at = Some(Utc::now());
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{FlowConfiguration, FlowType};

    fn flow() -> IntegrationFlow {
        IntegrationFlow::new(
            "orders-in",
            FlowConfiguration::new(serde_json::json!({}), FlowType::Inbound),
        )
    }

    fn deployed() -> DeployedFlow {
        let mut deployment = DeployedFlow::from_flow(&flow(), vec![]).unwrap();
        deployment.mark_deployed();
        deployment
    }

    #[test]
    fn test_inactive_flow_rejected() {
        let mut flow = flow();
        flow.deactivate();
        assert!(DeployedFlow::from_flow(&flow, vec![]).is_err());
    }

    #[test]
    fn test_can_execute_requires_all_three_gates() {
        let mut deployment = deployed();
        assert!(deployment.can_execute());

        deployment.set_execution_enabled(false);
        assert!(!deployment.can_execute());
        deployment.set_execution_enabled(true);
        assert!(deployment.can_execute());

        deployment.runtime_status = RuntimeStatus::Maintenance;
        assert!(!deployment.can_execute());
        deployment.runtime_status = RuntimeStatus::Active;

        deployment.suspend();
        assert!(!deployment.can_execute());
    }

    #[test]
    fn test_stats_smoothing_and_streak() {
        let stats = DeploymentStats::default().record(1000, true);
        assert_eq!(stats.average_execution_time_ms, 1000.0);
        assert_eq!(stats.consecutive_failures, 0);

        let stats = stats.record(500, true);
        assert_eq!(stats.average_execution_time_ms, 900.0);

        let stats = stats.record(100, false).record(100, false);
        assert_eq!(stats.consecutive_failures, 2);
        assert_eq!(stats.failed_executions, 2);

        let stats = stats.record(100, true);
        assert_eq!(stats.consecutive_failures, 0);
        assert_eq!(stats.total_executions, 5);
    }

    #[test]
    fn test_record_error_forces_error_status() {
        let mut deployment = deployed();
        deployment.record_error("sftp handshake failed");
        assert_eq!(deployment.runtime_status, RuntimeStatus::Error);
        assert_eq!(
            deployment.last_error_message.as_deref(),
            Some("sftp handshake failed")
        );
        assert_eq!(deployment.stats.consecutive_failures, 1);
        assert!(!deployment.can_execute());
    }

    #[test]
    fn test_clear_errors_restores_active_only_from_error() {
        let mut deployment = deployed();
        deployment.record_error("boom");
        deployment.clear_errors();
        assert_eq!(deployment.runtime_status, RuntimeStatus::Active);
        assert!(deployment.last_error_message.is_none());
        assert_eq!(deployment.stats.consecutive_failures, 0);

        // Other runtime statuses are not overridden.
        deployment.runtime_status = RuntimeStatus::Maintenance;
        deployment.last_error_message = Some("stale".to_string());
        deployment.clear_errors();
        assert_eq!(deployment.runtime_status, RuntimeStatus::Maintenance);
        assert!(deployment.last_error_message.is_none());
    }

    #[test]
    fn test_health_axis_independent_of_runtime() {
        let mut deployment = deployed();
        deployment.update_health_status(
            HealthStatus::Warning,
            Some("growing backlog".to_string()),
        );
        assert_eq!(deployment.runtime_status, RuntimeStatus::Active);
        assert_eq!(deployment.health_status, HealthStatus::Warning);
        assert!(deployment.can_execute());
        assert!(deployment.health_checked_at.is_some());
    }

    #[test]
    fn test_undeploy_keeps_record() {
        let mut deployment = deployed();
        deployment.mark_undeploying();
        assert_eq!(deployment.deployment_status, DeploymentStatus::Undeploying);
        deployment.mark_undeployed();
        assert_eq!(deployment.deployment_status, DeploymentStatus::Undeployed);
        assert!(!deployment.execution_enabled);
        assert!(!deployment.can_execute());
    }

    #[test]
    fn test_snapshot_is_frozen() {
        let mut flow = flow();
        let deployment = DeployedFlow::from_flow(&flow, vec![]).unwrap();
        assert_eq!(deployment.flow_version, 1);

        flow.update_definition(serde_json::json!({"steps": ["new"]}));
        assert_eq!(deployment.flow_version, 1);
        assert_ne!(deployment.config.definition, flow.config.definition);
    }
}
