//! Executor trait and registry keyed by adapter type and direction.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::context::{DispatchContext, StepRef};
use crate::descriptor::{AdapterDescriptor, AdapterType, Direction};
use crate::error::AdapterError;

/// A protocol-specific executor.
///
/// One implementation handles exactly one `(adapter_type, direction)`
/// combination; a protocol that both sends and receives registers two
/// executors.
#[async_trait]
pub trait AdapterExecutor: Send + Sync {
    /// Adapter type this executor handles.
    fn adapter_type(&self) -> AdapterType;

    /// Direction this executor handles.
    fn direction(&self) -> Direction;

    /// Execute against the endpoint and return an output map.
    async fn execute(
        &self,
        descriptor: &AdapterDescriptor,
        ctx: &DispatchContext,
        step: Option<&StepRef>,
    ) -> Result<HashMap<String, serde_json::Value>, AdapterError>;

    /// Validate the descriptor's configuration payload.
    ///
    /// Implementations check every constraint and report all violations in
    /// one [`AdapterError::Configuration`], never just the first.
    fn validate_configuration(&self, descriptor: &AdapterDescriptor) -> Result<(), AdapterError>;
}

/// Registry of executors keyed by `(AdapterType, Direction)`.
pub struct ExecutorRegistry {
    executors: HashMap<(AdapterType, Direction), Arc<dyn AdapterExecutor>>,
}

impl ExecutorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            executors: HashMap::new(),
        }
    }

    /// Register an executor under its declared type and direction.
    ///
    /// A later registration for the same key replaces the earlier one.
    pub fn register<E: AdapterExecutor + 'static>(&mut self, executor: E) {
        let key = (executor.adapter_type(), executor.direction());
        self.executors.insert(key, Arc::new(executor));
    }

    /// Look up an executor.
    pub fn get(
        &self,
        adapter_type: AdapterType,
        direction: Direction,
    ) -> Option<Arc<dyn AdapterExecutor>> {
        self.executors.get(&(adapter_type, direction)).cloned()
    }

    /// Check whether a combination is registered.
    pub fn has(&self, adapter_type: AdapterType, direction: Direction) -> bool {
        self.executors.contains_key(&(adapter_type, direction))
    }

    /// List all registered combinations.
    pub fn list(&self) -> Vec<(AdapterType, Direction)> {
        self.executors.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("executors", &self.executors.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Executor that returns a canned output map, or fails when configured to.
    pub struct StubExecutor {
        pub adapter_type: AdapterType,
        pub direction: Direction,
        pub fail_with: Option<String>,
    }

    #[async_trait]
    impl AdapterExecutor for StubExecutor {
        fn adapter_type(&self) -> AdapterType {
            self.adapter_type
        }

        fn direction(&self) -> Direction {
            self.direction
        }

        async fn execute(
            &self,
            _descriptor: &AdapterDescriptor,
            ctx: &DispatchContext,
            _step: Option<&StepRef>,
        ) -> Result<HashMap<String, serde_json::Value>, AdapterError> {
            if let Some(message) = &self.fail_with {
                return Err(AdapterError::Execution(message.clone()));
            }
            let mut output = HashMap::new();
            output.insert(
                "correlation_id".to_string(),
                serde_json::json!(ctx.correlation_id),
            );
            Ok(output)
        }

        fn validate_configuration(
            &self,
            _descriptor: &AdapterDescriptor,
        ) -> Result<(), AdapterError> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::StubExecutor;
    use super::*;

    fn stub(adapter_type: AdapterType, direction: Direction) -> StubExecutor {
        StubExecutor {
            adapter_type,
            direction,
            fail_with: None,
        }
    }

    #[test]
    fn test_registry_register_and_lookup() {
        let mut registry = ExecutorRegistry::new();
        registry.register(stub(AdapterType::Sftp, Direction::Sender));

        assert!(registry.has(AdapterType::Sftp, Direction::Sender));
        assert!(!registry.has(AdapterType::Sftp, Direction::Receiver));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_same_type_distinct_directions() {
        let mut registry = ExecutorRegistry::new();
        registry.register(stub(AdapterType::Email, Direction::Sender));
        registry.register(stub(AdapterType::Email, Direction::Receiver));

        assert_eq!(registry.len(), 2);
        assert!(registry.get(AdapterType::Email, Direction::Sender).is_some());
        assert!(registry.get(AdapterType::Email, Direction::Receiver).is_some());
    }

    #[tokio::test]
    async fn test_registered_executor_runs() {
        let mut registry = ExecutorRegistry::new();
        registry.register(stub(AdapterType::File, Direction::Receiver));

        let descriptor =
            AdapterDescriptor::new("inbox", AdapterType::File, Direction::Receiver);
        let ctx = DispatchContext::new("corr-9");
        let executor = registry
            .get(AdapterType::File, Direction::Receiver)
            .unwrap();
        let output = executor.execute(&descriptor, &ctx, None).await.unwrap();
        assert_eq!(output.get("correlation_id"), Some(&serde_json::json!("corr-9")));
    }
}
