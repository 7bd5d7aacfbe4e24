//! Flowgate Adapter Kit.
//!
//! Protocol adapters move data in and out of flows. This crate provides the
//! pieces the execution engine needs to call them without knowing protocol
//! details:
//!
//! - [`AdapterDescriptor`]: identity and configuration of a configured
//!   endpoint (type, direction, active flag, opaque config payload)
//! - [`AdapterExecutor`]: the trait a protocol implementation fulfils
//! - [`ExecutorRegistry`]: lookup keyed by `(AdapterType, Direction)`
//! - [`Dispatcher`]: fail-fast validation, correlation propagation, and
//!   result/error normalization around a single executor call
//! - [`DispatchContext`]: an explicit context value threaded through every
//!   dispatch instead of ambient per-thread state
//!
//! The only built-in executor pair is the local filesystem adapter in
//! [`fs`]; network protocols (SFTP, mail) register their own executors.

pub mod context;
pub mod descriptor;
pub mod dispatcher;
pub mod error;
pub mod fs;
pub mod registry;
pub mod result;

pub use context::{DispatchContext, StepRef};
pub use descriptor::{AdapterDescriptor, AdapterType, Direction};
pub use dispatcher::{DispatchFailure, Dispatcher};
pub use error::AdapterError;
pub use registry::{AdapterExecutor, ExecutorRegistry};
pub use result::{DispatchResult, DispatchStatus};

use crate::fs::{LocalFileReceiver, LocalFileSender};

/// Create a registry with the built-in local filesystem executors registered.
pub fn create_default_registry() -> ExecutorRegistry {
    let mut registry = ExecutorRegistry::new();
    registry.register(LocalFileSender::new());
    registry.register(LocalFileReceiver::new());
    registry
}
