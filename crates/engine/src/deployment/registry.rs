//! In-memory deployment registry.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::deployment::deployed::{DeployedFlow, HealthStatus};
use crate::error::{EngineError, EngineResult};
use crate::flow::IntegrationFlow;

/// Registry of active deployments.
///
/// All mutation goes through the write lock, so concurrent completions for
/// the same deployment cannot lose increments in the smoothed average.
/// Reads hand out clones; entries are never borrowed out of the lock.
#[derive(Clone, Default)]
pub struct DeploymentRegistry {
    inner: Arc<RwLock<HashMap<Uuid, DeployedFlow>>>,
}

impl DeploymentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploy a flow, snapshotting its configuration.
    ///
    /// Fails for inactive flows. The returned copy is already DEPLOYED and
    /// ACTIVE.
    pub async fn deploy(
        &self,
        flow: &IntegrationFlow,
        adapter_ids: Vec<Uuid>,
    ) -> EngineResult<DeployedFlow> {
        let mut deployment = DeployedFlow::from_flow(flow, adapter_ids)?;
        deployment.mark_deployed();

        info!(
            deployment_id = %deployment.id,
            flow = %flow.name,
            flow_version = flow.version,
            "Flow deployed"
        );

        let mut inner = self.inner.write().await;
        inner.insert(deployment.id, deployment.clone());
        Ok(deployment)
    }

    /// Undeploy. The record stays in the registry for history.
    pub async fn undeploy(&self, deployment_id: Uuid) -> EngineResult<()> {
        let mut inner = self.inner.write().await;
        let deployment = inner
            .get_mut(&deployment_id)
            .ok_or_else(|| EngineError::NotFound(format!("deployment {}", deployment_id)))?;
        deployment.mark_undeploying();
        deployment.mark_undeployed();
        info!(deployment_id = %deployment_id, flow = %deployment.flow_name, "Flow undeployed");
        Ok(())
    }

    pub async fn get(&self, deployment_id: Uuid) -> Option<DeployedFlow> {
        self.inner.read().await.get(&deployment_id).cloned()
    }

    pub async fn list(&self) -> Vec<DeployedFlow> {
        self.inner.read().await.values().cloned().collect()
    }

    /// Whether the deployment passes all three execution gates.
    pub async fn can_execute(&self, deployment_id: Uuid) -> bool {
        self.inner
            .read()
            .await
            .get(&deployment_id)
            .map(|d| d.can_execute())
            .unwrap_or(false)
    }

    /// Gate and admit one execution: checks `can_execute` and the parallel
    /// limit, then reserves a slot. Returns a snapshot of the deployment.
    pub async fn try_begin_execution(&self, deployment_id: Uuid) -> EngineResult<DeployedFlow> {
        let mut inner = self.inner.write().await;
        let deployment = inner
            .get_mut(&deployment_id)
            .ok_or_else(|| EngineError::NotFound(format!("deployment {}", deployment_id)))?;

        if !deployment.can_execute() {
            return Err(EngineError::Validation(format!(
                "Deployment of flow '{}' is not executable (deployment={}, runtime={}, enabled={})",
                deployment.flow_name,
                deployment.deployment_status,
                deployment.runtime_status,
                deployment.execution_enabled
            )));
        }

        if deployment.active_executions >= deployment.config.max_parallel_executions {
            return Err(EngineError::Validation(format!(
                "Deployment of flow '{}' is at its parallel execution limit ({})",
                deployment.flow_name, deployment.config.max_parallel_executions
            )));
        }

        deployment.active_executions += 1;
        Ok(deployment.clone())
    }

    /// Release the slot taken by [`DeploymentRegistry::try_begin_execution`]
    /// without touching the aggregate counters.
    ///
    /// For runs that ended without an outcome worth counting (operator
    /// cancellation): the run neither succeeded nor failed, so it must not
    /// feed the failure streak or the smoothed average.
    pub async fn release_execution(&self, deployment_id: Uuid) -> EngineResult<()> {
        let mut inner = self.inner.write().await;
        let deployment = inner
            .get_mut(&deployment_id)
            .ok_or_else(|| EngineError::NotFound(format!("deployment {}", deployment_id)))?;
        deployment.active_executions = deployment.active_executions.saturating_sub(1);
        Ok(())
    }

    /// Release the slot taken by [`DeploymentRegistry::try_begin_execution`]
    /// and fold the run's outcome into the aggregate counters.
    pub async fn finish_execution(
        &self,
        deployment_id: Uuid,
        duration_ms: u64,
        success: bool,
    ) -> EngineResult<()> {
        let mut inner = self.inner.write().await;
        let deployment = inner
            .get_mut(&deployment_id)
            .ok_or_else(|| EngineError::NotFound(format!("deployment {}", deployment_id)))?;
        deployment.active_executions = deployment.active_executions.saturating_sub(1);
        deployment.record_execution(duration_ms, success);
        if !success {
            warn!(
                deployment_id = %deployment_id,
                flow = %deployment.flow_name,
                consecutive_failures = deployment.stats.consecutive_failures,
                "Execution failed"
            );
        }
        Ok(())
    }

    pub async fn record_error(
        &self,
        deployment_id: Uuid,
        message: impl Into<String>,
    ) -> EngineResult<()> {
        let mut inner = self.inner.write().await;
        let deployment = inner
            .get_mut(&deployment_id)
            .ok_or_else(|| EngineError::NotFound(format!("deployment {}", deployment_id)))?;
        deployment.record_error(message);
        Ok(())
    }

    pub async fn clear_errors(&self, deployment_id: Uuid) -> EngineResult<()> {
        let mut inner = self.inner.write().await;
        let deployment = inner
            .get_mut(&deployment_id)
            .ok_or_else(|| EngineError::NotFound(format!("deployment {}", deployment_id)))?;
        deployment.clear_errors();
        Ok(())
    }

    pub async fn update_health(
        &self,
        deployment_id: Uuid,
        status: HealthStatus,
        message: Option<String>,
    ) -> EngineResult<()> {
        let mut inner = self.inner.write().await;
        let deployment = inner
            .get_mut(&deployment_id)
            .ok_or_else(|| EngineError::NotFound(format!("deployment {}", deployment_id)))?;
        deployment.update_health_status(status, message);
        Ok(())
    }

    pub async fn set_execution_enabled(
        &self,
        deployment_id: Uuid,
        enabled: bool,
    ) -> EngineResult<()> {
        let mut inner = self.inner.write().await;
        let deployment = inner
            .get_mut(&deployment_id)
            .ok_or_else(|| EngineError::NotFound(format!("deployment {}", deployment_id)))?;
        deployment.set_execution_enabled(enabled);
        Ok(())
    }
}
