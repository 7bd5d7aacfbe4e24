//! Persistence traits and the in-memory store.
//!
//! The engine consumes durable storage through these traits; the concrete
//! backend lives with the embedder. [`MemoryStore`] serves tests and
//! single-process deployments.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::execution::{FlowExecution, FlowExecutionStep};
use crate::flow::IntegrationFlow;

/// Durable storage for flow definitions.
#[async_trait]
pub trait FlowStore: Send + Sync {
    async fn save_flow(&self, flow: &IntegrationFlow) -> EngineResult<()>;
    async fn get_flow(&self, id: Uuid) -> EngineResult<Option<IntegrationFlow>>;
    async fn list_flows(&self) -> EngineResult<Vec<IntegrationFlow>>;
}

/// Durable storage for executions and their steps.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    async fn save_execution(&self, execution: &FlowExecution) -> EngineResult<()>;
    async fn get_execution(&self, id: Uuid) -> EngineResult<Option<FlowExecution>>;
    async fn executions_for_flow(&self, flow_id: Uuid) -> EngineResult<Vec<FlowExecution>>;
    /// Save a step. Positions are unique within an execution; a second step
    /// at an occupied position is rejected (re-saving a step is fine).
    async fn save_step(&self, step: &FlowExecutionStep) -> EngineResult<()>;
    /// Steps of one execution, ordered by position.
    async fn steps_for_execution(
        &self,
        execution_id: Uuid,
    ) -> EngineResult<Vec<FlowExecutionStep>>;
}

/// In-memory store backed by `RwLock`'d maps.
#[derive(Clone, Default)]
pub struct MemoryStore {
    flows: Arc<RwLock<HashMap<Uuid, IntegrationFlow>>>,
    executions: Arc<RwLock<HashMap<Uuid, FlowExecution>>>,
    steps: Arc<RwLock<HashMap<Uuid, FlowExecutionStep>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FlowStore for MemoryStore {
    async fn save_flow(&self, flow: &IntegrationFlow) -> EngineResult<()> {
        self.flows.write().await.insert(flow.id, flow.clone());
        Ok(())
    }

    async fn get_flow(&self, id: Uuid) -> EngineResult<Option<IntegrationFlow>> {
        Ok(self.flows.read().await.get(&id).cloned())
    }

    async fn list_flows(&self) -> EngineResult<Vec<IntegrationFlow>> {
        Ok(self.flows.read().await.values().cloned().collect())
    }
}

#[async_trait]
impl ExecutionStore for MemoryStore {
    async fn save_execution(&self, execution: &FlowExecution) -> EngineResult<()> {
        self.executions
            .write()
            .await
            .insert(execution.id, execution.clone());
        Ok(())
    }

    async fn get_execution(&self, id: Uuid) -> EngineResult<Option<FlowExecution>> {
        Ok(self.executions.read().await.get(&id).cloned())
    }

    async fn executions_for_flow(&self, flow_id: Uuid) -> EngineResult<Vec<FlowExecution>> {
        let mut executions: Vec<FlowExecution> = self
            .executions
            .read()
            .await
            .values()
            .filter(|e| e.flow_id == flow_id)
            .cloned()
            .collect();
        executions.sort_by_key(|e| e.created_at);
        Ok(executions)
    }

    async fn save_step(&self, step: &FlowExecutionStep) -> EngineResult<()> {
        let mut steps = self.steps.write().await;
        let occupied = steps.values().any(|s| {
            s.execution_id == step.execution_id && s.position == step.position && s.id != step.id
        });
        if occupied {
            return Err(EngineError::Validation(format!(
                "step position {} is already taken in execution {}",
                step.position, step.execution_id
            )));
        }
        steps.insert(step.id, step.clone());
        Ok(())
    }

    async fn steps_for_execution(
        &self,
        execution_id: Uuid,
    ) -> EngineResult<Vec<FlowExecutionStep>> {
        let mut steps: Vec<FlowExecutionStep> = self
            .steps
            .read()
            .await
            .values()
            .filter(|s| s.execution_id == execution_id)
            .cloned()
            .collect();
        steps.sort_by_key(|s| s.position);
        Ok(steps)
    }
}
