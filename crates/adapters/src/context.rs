//! Dispatch context passed to executors.
//!
//! Correlation identity travels as an explicit value that is cloned and
//! enriched per dispatch. There is no process-global or per-thread context
//! to set up or clear; nested dispatches derive their own copy, so nothing
//! can leak across concurrent executions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Lightweight reference to the step a dispatch runs on behalf of.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRef {
    pub id: Uuid,
    pub name: String,
    pub step_type: String,
}

/// Context value threaded through every adapter dispatch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchContext {
    /// Correlation ID threaded through an execution's steps and logs.
    pub correlation_id: String,

    /// Execution this dispatch belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<Uuid>,

    /// Flow identity, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<Uuid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_name: Option<String>,

    /// Adapter identity, filled in by the dispatcher before the call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adapter_id: Option<Uuid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub adapter_name: Option<String>,

    /// Variables available to the executor (payload, staging paths et al).
    #[serde(default)]
    pub variables: HashMap<String, serde_json::Value>,
}

impl DispatchContext {
    /// Create a context with the given correlation ID.
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            ..Default::default()
        }
    }

    /// Attach the owning execution.
    pub fn with_execution(mut self, execution_id: Uuid) -> Self {
        self.execution_id = Some(execution_id);
        self
    }

    /// Attach flow identity.
    pub fn with_flow(mut self, flow_id: Uuid, flow_name: impl Into<String>) -> Self {
        self.flow_id = Some(flow_id);
        self.flow_name = Some(flow_name.into());
        self
    }

    /// Attach adapter identity. Called by the dispatcher, not by executors.
    pub fn with_adapter(mut self, adapter_id: Uuid, adapter_name: impl Into<String>) -> Self {
        self.adapter_id = Some(adapter_id);
        self.adapter_name = Some(adapter_name.into());
        self
    }

    /// Set a variable value.
    pub fn set_variable(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.variables.insert(name.into(), value);
    }

    /// Get a variable value.
    pub fn get_variable(&self, name: &str) -> Option<&serde_json::Value> {
        self.variables.get(name)
    }

    /// Get a variable as a string.
    pub fn get_variable_str(&self, name: &str) -> Option<String> {
        self.variables.get(name).map(|v| match v {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_builder() {
        let flow_id = Uuid::new_v4();
        let execution_id = Uuid::new_v4();
        let ctx = DispatchContext::new("corr-1")
            .with_execution(execution_id)
            .with_flow(flow_id, "nightly-transfer");

        assert_eq!(ctx.correlation_id, "corr-1");
        assert_eq!(ctx.execution_id, Some(execution_id));
        assert_eq!(ctx.flow_name.as_deref(), Some("nightly-transfer"));
        assert!(ctx.adapter_id.is_none());
    }

    #[test]
    fn test_context_variables() {
        let mut ctx = DispatchContext::new("corr-2");
        ctx.set_variable("payload", serde_json::json!("hello"));
        ctx.set_variable("count", serde_json::json!(3));

        assert_eq!(ctx.get_variable_str("payload").as_deref(), Some("hello"));
        assert_eq!(ctx.get_variable_str("count").as_deref(), Some("3"));
        assert!(ctx.get_variable("missing").is_none());
    }

    #[test]
    fn test_derived_context_does_not_leak_back() {
        let base = DispatchContext::new("corr-3");
        let derived = base.clone().with_adapter(Uuid::new_v4(), "sftp-out");

        assert!(base.adapter_id.is_none());
        assert!(derived.adapter_id.is_some());
    }
}
