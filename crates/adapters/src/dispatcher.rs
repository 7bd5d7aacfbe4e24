//! Adapter dispatch: validation, executor resolution, result normalization.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::context::{DispatchContext, StepRef};
use crate::descriptor::AdapterDescriptor;
use crate::error::AdapterError;
use crate::registry::ExecutorRegistry;
use crate::result::DispatchResult;

/// A dispatch that did not succeed.
///
/// Carries both the structured failure result (adapter identity, `Failed`
/// status, `has_data=false`) and the underlying cause, so callers that only
/// read the result map and callers that propagate errors both see the
/// failure. Nothing is swallowed on either path.
#[derive(Debug, thiserror::Error)]
#[error("Dispatch to adapter '{}' failed: {source}", .result.adapter_name)]
pub struct DispatchFailure {
    pub result: DispatchResult,
    #[source]
    pub source: AdapterError,
}

/// Routes adapter calls to the executor registered for the descriptor's
/// type and direction.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ExecutorRegistry>,
}

impl Dispatcher {
    /// Create a dispatcher over a registry.
    pub fn new(registry: Arc<ExecutorRegistry>) -> Self {
        Self { registry }
    }

    /// Execute one adapter call.
    ///
    /// Rejects inactive descriptors before any side effect. An unregistered
    /// `(type, direction)` combination is a typed error naming both fields,
    /// never a silent default. Correlation identity is copied into a derived
    /// context before the call so executor logs and nested work can be
    /// attributed.
    pub async fn dispatch(
        &self,
        descriptor: &AdapterDescriptor,
        ctx: &DispatchContext,
        step: Option<&StepRef>,
    ) -> Result<DispatchResult, Box<DispatchFailure>> {
        if !descriptor.active {
            let source = AdapterError::Inactive(descriptor.name.clone());
            warn!(
                adapter = %descriptor.name,
                correlation_id = %ctx.correlation_id,
                "Rejected dispatch to inactive adapter"
            );
            return Err(Box::new(DispatchFailure {
                result: DispatchResult::failed(descriptor, source.to_string()),
                source,
            }));
        }

        let executor = match self
            .registry
            .get(descriptor.adapter_type, descriptor.direction)
        {
            Some(executor) => executor,
            None => {
                let source = AdapterError::Unsupported {
                    adapter_type: descriptor.adapter_type,
                    direction: descriptor.direction,
                };
                warn!(
                    adapter = %descriptor.name,
                    adapter_type = %descriptor.adapter_type,
                    direction = %descriptor.direction,
                    "No executor registered"
                );
                return Err(Box::new(DispatchFailure {
                    result: DispatchResult::failed(descriptor, source.to_string()),
                    source,
                }));
            }
        };

        let ctx = ctx.clone().with_adapter(descriptor.id, &descriptor.name);
        let base = DispatchResult::started(descriptor);

        debug!(
            adapter = %descriptor.name,
            adapter_type = %descriptor.adapter_type,
            direction = %descriptor.direction,
            correlation_id = %ctx.correlation_id,
            step = step.map(|s| s.name.as_str()).unwrap_or("-"),
            "Dispatching adapter call"
        );

        match executor.execute(descriptor, &ctx, step).await {
            Ok(output) => Ok(base.completed(output)),
            Err(source) => {
                warn!(
                    adapter = %descriptor.name,
                    correlation_id = %ctx.correlation_id,
                    error = %source,
                    "Adapter execution failed"
                );
                Err(Box::new(DispatchFailure {
                    result: DispatchResult::failed(descriptor, source.to_string()),
                    source,
                }))
            }
        }
    }

    /// Validate a descriptor's configuration against its executor.
    ///
    /// Fails with the unsupported-combination error when no executor is
    /// registered; otherwise defers to the executor, which reports every
    /// violated constraint.
    pub fn validate(&self, descriptor: &AdapterDescriptor) -> Result<(), AdapterError> {
        let executor = self
            .registry
            .get(descriptor.adapter_type, descriptor.direction)
            .ok_or(AdapterError::Unsupported {
                adapter_type: descriptor.adapter_type,
                direction: descriptor.direction,
            })?;
        executor.validate_configuration(descriptor)
    }
}
