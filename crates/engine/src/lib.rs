//! Flowgate Engine Library
//!
//! The execution orchestration core for Flowgate, an integration middleware
//! that moves files between external endpoints according to user-defined
//! flows. This crate owns:
//!
//! - **Flow definitions**: versioned [`flow::IntegrationFlow`] records with
//!   configuration, schedule, and rolling metrics
//! - **Deployments**: the runtime registry entry that gates whether a flow
//!   may run and aggregates its health and performance
//! - **Executions**: per-run and per-step state machines with timing, file
//!   counters, error detail, and retry lineage
//! - **The execution engine**: drives steps through the adapter dispatcher
//!   and feeds results back into the deployment registry
//! - **The scheduler**: computes next run times from simplified cron
//!   expressions
//!
//! Protocol executors live behind the `flowgate-adapters` seam; persistence
//! is consumed through the [`store`] traits. There is no HTTP surface here.
//!
//! ## Modules
//!
//! - [`config`]: engine configuration from environment variables
//! - [`crypto`]: authenticated flow export envelope
//! - [`deployment`]: deployed flows, health, and the in-memory registry
//! - [`engine`]: the execution engine
//! - [`error`]: engine error types
//! - [`execution`]: execution and step entities
//! - [`flow`]: flow definitions, configuration, metrics
//! - [`scheduler`]: cron-style next-run computation
//! - [`store`]: persistence traits and the in-memory store

pub mod config;
pub mod crypto;
pub mod deployment;
pub mod engine;
pub mod error;
pub mod execution;
pub mod flow;
pub mod result_ext;
pub mod scheduler;
pub mod store;
pub mod telemetry;

pub use engine::ExecutionEngine;
pub use error::{EngineError, EngineResult};
pub use result_ext::ResultExt;
