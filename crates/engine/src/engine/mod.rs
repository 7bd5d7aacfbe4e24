//! The execution engine: ties deployments, dispatch and persistence together.

mod runner;

pub use runner::ExecutionEngine;
