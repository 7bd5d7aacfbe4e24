//! Flow execution step entity and its status state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Status of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    /// Precondition was false; the step never started.
    Skipped,
    Cancelled,
    Timeout,
}

impl StepStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, StepStatus::Pending | StepStatus::Running)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

/// Kind of work a step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    AdapterSender,
    AdapterReceiver,
    Utility,
    Decision,
    /// Fans out to parallel sibling paths.
    Split,
    /// Rejoin point for SPLIT paths.
    Merge,
    Wait,
    Notification,
}

impl std::fmt::Display for StepType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AdapterSender => write!(f, "adapter_sender"),
            Self::AdapterReceiver => write!(f, "adapter_receiver"),
            Self::Utility => write!(f, "utility"),
            Self::Decision => write!(f, "decision"),
            Self::Split => write!(f, "split"),
            Self::Merge => write!(f, "merge"),
            Self::Wait => write!(f, "wait"),
            Self::Notification => write!(f, "notification"),
        }
    }
}

/// Which side of the step a processed file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileDirection {
    Input,
    Output,
}

/// One unit of work inside an execution.
///
/// Steps are owned by their execution and ordered by `position` (unique and
/// strictly increasing, enforced by the step graph collaborator that creates
/// them). Transition methods mirror the execution state machine and return
/// `true` only when they took effect; SKIPPED is the one terminal state
/// reachable directly from PENDING.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowExecutionStep {
    pub id: Uuid,
    pub execution_id: Uuid,
    pub name: String,
    pub step_type: StepType,
    pub position: u32,
    pub status: StepStatus,

    /// Configuration snapshot taken when the step was created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,

    #[serde(default)]
    pub input_files: Vec<String>,
    #[serde(default)]
    pub output_files: Vec<String>,
    pub bytes_in: u64,
    pub bytes_out: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    /// Resource usage samples reported by the executor (cpu, memory, ...).
    #[serde(default)]
    pub resource_usage: HashMap<String, serde_json::Value>,
}

impl FlowExecutionStep {
    pub fn new(
        execution_id: Uuid,
        name: impl Into<String>,
        step_type: StepType,
        position: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            execution_id,
            name: name.into(),
            step_type,
            position,
            status: StepStatus::Pending,
            config: None,
            started_at: None,
            completed_at: None,
            duration_ms: None,
            input_files: Vec::new(),
            output_files: Vec::new(),
            bytes_in: 0,
            bytes_out: 0,
            error_message: None,
            error_details: None,
            skip_reason: None,
            exit_code: None,
            resource_usage: HashMap::new(),
        }
    }

    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = Some(config);
        self
    }

    /// PENDING -> RUNNING.
    pub fn start(&mut self) -> bool {
        if self.status != StepStatus::Pending {
            return false;
        }
        self.status = StepStatus::Running;
        self.started_at = Some(Utc::now());
        true
    }

    /// RUNNING -> COMPLETED.
    pub fn complete(&mut self) -> bool {
        if self.status != StepStatus::Running {
            return false;
        }
        self.status = StepStatus::Completed;
        self.finish();
        true
    }

    /// RUNNING -> FAILED with error detail and optional exit code.
    pub fn fail(
        &mut self,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
        exit_code: Option<i32>,
    ) -> bool {
        if self.status != StepStatus::Running {
            return false;
        }
        self.status = StepStatus::Failed;
        self.error_message = Some(message.into());
        self.error_details = details;
        self.exit_code = exit_code;
        self.finish();
        true
    }

    /// PENDING -> SKIPPED with a reason. The one terminal transition that
    /// does not require the step to have started.
    pub fn skip(&mut self, reason: impl Into<String>) -> bool {
        if self.status != StepStatus::Pending {
            return false;
        }
        self.status = StepStatus::Skipped;
        self.skip_reason = Some(reason.into());
        self.completed_at = Some(Utc::now());
        true
    }

    /// PENDING or RUNNING -> CANCELLED.
    pub fn cancel(&mut self) -> bool {
        if !self.status.is_active() {
            return false;
        }
        let was_running = self.status == StepStatus::Running;
        self.status = StepStatus::Cancelled;
        if was_running {
            self.finish();
        }
        true
    }

    /// Any active state -> TIMEOUT.
    pub fn timeout(&mut self) -> bool {
        if !self.status.is_active() {
            return false;
        }
        let was_running = self.status == StepStatus::Running;
        self.status = StepStatus::Timeout;
        if was_running {
            self.finish();
        }
        true
    }

    /// Record one processed file. The only way step counters change.
    ///
    /// Input entries are idempotent: a duplicate input file name neither
    /// re-appends nor double-counts its bytes. Only valid while RUNNING.
    pub fn record_file(&mut self, direction: FileDirection, name: &str, bytes: u64) -> bool {
        if self.status != StepStatus::Running {
            return false;
        }
        match direction {
            FileDirection::Input => {
                if self.input_files.iter().any(|f| f == name) {
                    return false;
                }
                self.input_files.push(name.to_string());
                self.bytes_in += bytes;
            }
            FileDirection::Output => {
                self.output_files.push(name.to_string());
                self.bytes_out += bytes;
            }
        }
        true
    }

    /// Record an executor-reported resource sample.
    pub fn record_resource_sample(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.resource_usage.insert(key.into(), value);
    }

    fn finish(&mut self) {
        let now = Utc::now();
        self.completed_at = Some(now);
        if let Some(started_at) = self.started_at {
            self.duration_ms = Some((now - started_at).num_milliseconds());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step() -> FlowExecutionStep {
        FlowExecutionStep::new(Uuid::new_v4(), "collect", StepType::AdapterReceiver, 1)
    }

    #[test]
    fn test_happy_path() {
        let mut step = step();
        assert!(step.start());
        assert!(step.complete());
        assert_eq!(step.status, StepStatus::Completed);
        assert!(step.duration_ms.is_some());
    }

    #[test]
    fn test_complete_requires_running() {
        let mut step = step();
        assert!(!step.complete());
        assert_eq!(step.status, StepStatus::Pending);
    }

    #[test]
    fn test_skip_only_from_pending() {
        let mut step = step();
        assert!(step.skip("no files matched"));
        assert_eq!(step.status, StepStatus::Skipped);
        assert_eq!(step.skip_reason.as_deref(), Some("no files matched"));
        assert!(step.started_at.is_none());

        let mut running = self::step();
        running.start();
        assert!(!running.skip("too late"));
        assert_eq!(running.status, StepStatus::Running);
    }

    #[test]
    fn test_fail_captures_exit_code() {
        let mut step = step();
        step.start();
        assert!(step.fail("unzip failed", Some(serde_json::json!({"entry": 3})), Some(2)));
        assert_eq!(step.status, StepStatus::Failed);
        assert_eq!(step.exit_code, Some(2));
        assert_eq!(step.error_message.as_deref(), Some("unzip failed"));
    }

    #[test]
    fn test_cancel_and_timeout_noop_on_terminal() {
        let mut step = step();
        step.start();
        step.complete();
        assert!(!step.cancel());
        assert!(!step.timeout());
        assert_eq!(step.status, StepStatus::Completed);
    }

    #[test]
    fn test_record_file_idempotent_inputs() {
        let mut step = step();
        step.start();

        assert!(step.record_file(FileDirection::Input, "a.csv", 100));
        assert!(!step.record_file(FileDirection::Input, "a.csv", 100));
        assert_eq!(step.input_files, vec!["a.csv"]);
        assert_eq!(step.bytes_in, 100);

        assert!(step.record_file(FileDirection::Output, "a.out", 40));
        assert!(step.record_file(FileDirection::Output, "b.out", 60));
        assert_eq!(step.output_files.len(), 2);
        assert_eq!(step.bytes_out, 100);
    }

    #[test]
    fn test_record_file_requires_running() {
        let mut step = step();
        assert!(!step.record_file(FileDirection::Input, "a.csv", 100));
        assert!(step.input_files.is_empty());

        step.start();
        step.complete();
        assert!(!step.record_file(FileDirection::Output, "late.out", 1));
        assert!(step.output_files.is_empty());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(StepStatus::Skipped.to_string(), "skipped");
        assert_eq!(StepType::AdapterSender.to_string(), "adapter_sender");
    }
}
