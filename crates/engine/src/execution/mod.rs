//! Execution entities: one run of a deployed flow and its ordered steps.

mod execution;
mod step;

pub use self::execution::{ExecutionStatus, FlowExecution, TriggerType};
pub use self::step::{FileDirection, FlowExecutionStep, StepStatus, StepType};
