use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use flowgate_adapters::{
    AdapterDescriptor, DispatchContext, DispatchResult, Dispatcher, ExecutorRegistry, StepRef,
};

use crate::config::EngineConfig;
use crate::deployment::DeploymentRegistry;
use crate::error::{EngineError, EngineResult};
use crate::execution::{
    ExecutionStatus, FileDirection, FlowExecution, FlowExecutionStep, TriggerType,
};
use crate::store::ExecutionStore;

/// Orchestrates flow executions against deployed flows.
///
/// The engine owns the deployment registry and the adapter dispatcher; the
/// embedder owns the store and decides which steps to run in which order.
/// Every state change made here goes through the entity transition methods,
/// so an engine call can never put an execution into a state the entity
/// itself would refuse.
pub struct ExecutionEngine {
    deployments: DeploymentRegistry,
    dispatcher: Dispatcher,
    store: Arc<dyn ExecutionStore>,
    config: EngineConfig,
}

impl ExecutionEngine {
    pub fn new(
        registry: Arc<ExecutorRegistry>,
        store: Arc<dyn ExecutionStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            deployments: DeploymentRegistry::new(),
            dispatcher: Dispatcher::new(registry),
            store,
            config,
        }
    }

    pub fn deployments(&self) -> &DeploymentRegistry {
        &self.deployments
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start a new execution against a deployment.
    ///
    /// Reserves an execution slot first; the reservation applies all three
    /// execution gates plus the parallelism cap atomically. The execution is
    /// persisted already RUNNING, with a timeout deadline taken from the
    /// deployment's frozen configuration (engine default when the flow left
    /// it at zero) and the retry budget from its retry policy.
    pub async fn start_execution(
        &self,
        deployment_id: Uuid,
        trigger: TriggerType,
        payload: Option<serde_json::Value>,
    ) -> EngineResult<FlowExecution> {
        let deployment = self.deployments.try_begin_execution(deployment_id).await?;

        let timeout_minutes = if deployment.config.timeout_minutes == 0 {
            self.config.default_timeout_minutes
        } else {
            deployment.config.timeout_minutes
        };
        let max_retry_attempts = if deployment.config.retry_policy.max_attempts == 0 {
            self.config.default_max_retry_attempts
        } else {
            deployment.config.retry_policy.max_attempts
        };

        let mut execution = FlowExecution::new(
            deployment.id,
            deployment.flow_id,
            deployment.flow_name.clone(),
            trigger,
        )
        .with_timeout_at(Utc::now() + Duration::minutes(i64::from(timeout_minutes)))
        .with_retry_budget(max_retry_attempts);

        if let Some(payload) = payload {
            execution = execution.with_payload(payload);
        }

        execution.start();
        self.store.save_execution(&execution).await?;

        info!(
            execution_id = %execution.id,
            flow_name = %execution.flow_name,
            trigger = %execution.trigger,
            correlation_id = %execution.correlation_id,
            "Execution started"
        );

        Ok(execution)
    }

    /// Run one adapter-backed step of an execution.
    ///
    /// On success the step's file counters are updated from the dispatch
    /// result and both entities are persisted. On failure the step and the
    /// execution are both failed, the execution keeps a pointer to the
    /// failing step, and the structured dispatch result is preserved as
    /// error detail.
    pub async fn run_step(
        &self,
        execution: &mut FlowExecution,
        step: &mut FlowExecutionStep,
        descriptor: &AdapterDescriptor,
        variables: HashMap<String, serde_json::Value>,
    ) -> EngineResult<DispatchResult> {
        if !step.start() {
            return Err(EngineError::Validation(format!(
                "step '{}' is not pending (status {})",
                step.name, step.status
            )));
        }
        self.store.save_step(step).await?;

        let mut ctx = DispatchContext::new(execution.correlation_id.clone())
            .with_execution(execution.id)
            .with_flow(execution.flow_id, execution.flow_name.clone());
        for (name, value) in variables {
            ctx.set_variable(name, value);
        }

        let step_ref = StepRef {
            id: step.id,
            name: step.name.clone(),
            step_type: step.step_type.to_string(),
        };

        match self.dispatcher.dispatch(descriptor, &ctx, Some(&step_ref)).await {
            Ok(result) => {
                // Executors report a dispatch-level byte total, not one per
                // file; the total is attributed to the first entry.
                for (index, file) in result.output_files.iter().enumerate() {
                    let bytes = if index == 0 { result.bytes_transferred } else { 0 };
                    step.record_file(FileDirection::Output, file, bytes);
                }
                step.complete();
                execution.record_file_activity(result.files_processed, result.bytes_transferred);

                self.store.save_step(step).await?;
                self.store.save_execution(execution).await?;

                info!(
                    execution_id = %execution.id,
                    step = %step.name,
                    adapter = %descriptor.name,
                    files = result.files_processed,
                    "Step completed"
                );
                Ok(result)
            }
            Err(failure) => {
                let message = failure.source.to_string();
                let details = serde_json::to_value(&failure.result).ok();

                step.fail(&message, details.clone(), None);
                execution.fail(&message, details, Some(step.id));

                self.store.save_step(step).await?;
                self.store.save_execution(execution).await?;

                warn!(
                    execution_id = %execution.id,
                    step = %step.name,
                    adapter = %descriptor.name,
                    error = %message,
                    "Step failed"
                );
                Err(EngineError::Dispatch(message))
            }
        }
    }

    /// Close out an execution and release its slot.
    ///
    /// A still-running execution is completed; one already failed or timed
    /// out keeps its terminal state. The deployment's slot is released and
    /// its statistics updated. An execution whose slot was already released
    /// (a prior `finalize`, cancellation, or timeout sweep) is left alone.
    pub async fn finalize(&self, execution: &mut FlowExecution) -> EngineResult<()> {
        if execution.finalized {
            return Ok(());
        }
        if execution.status == ExecutionStatus::Running {
            execution.complete();
        }
        execution.finalized = true;
        self.store.save_execution(execution).await?;

        let success = execution.status == ExecutionStatus::Completed;
        let duration_ms = execution.duration_ms.unwrap_or(0).max(0) as u64;
        self.deployments
            .finish_execution(execution.deployment_id, duration_ms, success)
            .await?;

        info!(
            execution_id = %execution.id,
            status = %execution.status,
            duration_ms,
            "Execution finalized"
        );
        Ok(())
    }

    /// Cancel an active execution and release its slot.
    ///
    /// A cancelled run neither succeeded nor failed, so nothing is folded
    /// into the deployment's counters; the slot is simply returned.
    pub async fn cancel_execution(&self, execution: &mut FlowExecution) -> EngineResult<bool> {
        if !execution.cancel() {
            return Ok(false);
        }
        execution.finalized = true;
        self.store.save_execution(execution).await?;
        self.deployments
            .release_execution(execution.deployment_id)
            .await?;

        info!(
            execution_id = %execution.id,
            flow_name = %execution.flow_name,
            "Execution cancelled"
        );
        Ok(true)
    }

    /// Time out an execution whose deadline has passed.
    ///
    /// Returns `false` when the execution is not overdue, so this is safe to
    /// call from a periodic sweep over all active executions.
    pub async fn expire_if_overdue(
        &self,
        execution: &mut FlowExecution,
        now: DateTime<Utc>,
    ) -> EngineResult<bool> {
        if !execution.is_overdue(now) {
            return Ok(false);
        }
        execution.timeout();
        execution.finalized = true;
        self.store.save_execution(execution).await?;

        let duration_ms = execution.duration_ms.unwrap_or(0).max(0) as u64;
        self.deployments
            .finish_execution(execution.deployment_id, duration_ms, false)
            .await?;

        warn!(
            execution_id = %execution.id,
            flow_name = %execution.flow_name,
            "Execution timed out"
        );
        Ok(true)
    }

    /// Spawn the retry child for a failed or timed-out execution.
    ///
    /// The parent moves to RETRY_PENDING and both parent and child are
    /// persisted. Fails when the retry budget is exhausted or the parent is
    /// not in a retryable state.
    pub async fn create_retry_execution(
        &self,
        execution: &mut FlowExecution,
    ) -> EngineResult<FlowExecution> {
        if !execution.mark_for_retry() {
            return Err(EngineError::Validation(format!(
                "execution {} is not retryable (status {}, attempt {}/{})",
                execution.id, execution.status, execution.retry_attempt, execution.max_retry_attempts
            )));
        }
        let child = execution.retry_child();
        self.store.save_execution(execution).await?;
        self.store.save_execution(&child).await?;

        info!(
            execution_id = %child.id,
            parent_execution_id = %execution.id,
            attempt = child.retry_attempt,
            "Retry execution created"
        );
        Ok(child)
    }
}
