//! Flow execution entity and its status state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a flow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Created, not yet started.
    Pending,
    /// Steps are running.
    Running,
    /// Finished successfully.
    Completed,
    /// A step failed.
    Failed,
    /// Cancelled by an operator.
    Cancelled,
    /// Deadline exceeded.
    Timeout,
    /// Failed or timed out and queued for retry.
    RetryPending,
}

impl ExecutionStatus {
    /// Whether the execution is still in flight.
    pub fn is_active(&self) -> bool {
        matches!(self, ExecutionStatus::Pending | ExecutionStatus::Running)
    }

    /// Whether the execution reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed
                | ExecutionStatus::Failed
                | ExecutionStatus::Cancelled
                | ExecutionStatus::Timeout
        )
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Timeout => write!(f, "timeout"),
            Self::RetryPending => write!(f, "retry_pending"),
        }
    }
}

impl From<&str> for ExecutionStatus {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "running" | "in_progress" => Self::Running,
            "completed" | "success" => Self::Completed,
            "failed" | "error" => Self::Failed,
            "cancelled" | "canceled" => Self::Cancelled,
            "timeout" => Self::Timeout,
            "retry_pending" => Self::RetryPending,
            _ => Self::Pending,
        }
    }
}

/// What caused an execution to be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    Manual,
    Scheduled,
    Api,
    Retry,
    Webhook,
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::Scheduled => write!(f, "scheduled"),
            Self::Api => write!(f, "api"),
            Self::Retry => write!(f, "retry"),
            Self::Webhook => write!(f, "webhook"),
        }
    }
}

/// One run of a deployed flow.
///
/// Transition methods guard on the current status and return `true` only
/// when they took effect; an attempt from the wrong state is an observable
/// no-op. `completed_at` and `duration_ms` are frozen exactly once, by the
/// terminal transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowExecution {
    pub id: Uuid,
    pub deployment_id: Uuid,
    pub flow_id: Uuid,
    /// Flow name at creation time; later renames do not rewrite history.
    pub flow_name: String,
    pub status: ExecutionStatus,
    pub trigger: TriggerType,

    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Deadline enforced by an external watchdog via [`FlowExecution::timeout`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,

    /// Input payload snapshot for replay and debugging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,

    pub files_processed: u64,
    pub bytes_transferred: u64,
    /// Expected file count when known; scales the running progress estimate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_expected: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_step_id: Option<Uuid>,

    pub retry_attempt: u32,
    pub max_retry_attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_execution_id: Option<Uuid>,

    pub correlation_id: String,
    /// 1 (lowest) to 10 (highest).
    pub priority: u8,

    /// Whether the run's deployment slot has been released. Set once by the
    /// engine; keeps a second close-out from double-counting statistics.
    #[serde(default)]
    pub finalized: bool,
}

impl FlowExecution {
    /// Create a pending execution for a deployment.
    pub fn new(
        deployment_id: Uuid,
        flow_id: Uuid,
        flow_name: impl Into<String>,
        trigger: TriggerType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            deployment_id,
            flow_id,
            flow_name: flow_name.into(),
            status: ExecutionStatus::Pending,
            trigger,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            timeout_at: None,
            duration_ms: None,
            payload: None,
            files_processed: 0,
            bytes_transferred: 0,
            files_expected: None,
            error_message: None,
            error_details: None,
            error_step_id: None,
            retry_attempt: 0,
            max_retry_attempts: 0,
            parent_execution_id: None,
            correlation_id: Uuid::new_v4().to_string(),
            priority: 5,
            finalized: false,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_timeout_at(mut self, timeout_at: DateTime<Utc>) -> Self {
        self.timeout_at = Some(timeout_at);
        self
    }

    pub fn with_retry_budget(mut self, max_retry_attempts: u32) -> Self {
        self.max_retry_attempts = max_retry_attempts;
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    /// Priority clamped to 1..=10.
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.clamp(1, 10);
        self
    }

    /// PENDING -> RUNNING.
    pub fn start(&mut self) -> bool {
        if self.status != ExecutionStatus::Pending {
            return false;
        }
        self.status = ExecutionStatus::Running;
        self.started_at = Some(Utc::now());
        true
    }

    /// RUNNING -> COMPLETED.
    pub fn complete(&mut self) -> bool {
        if self.status != ExecutionStatus::Running {
            return false;
        }
        self.status = ExecutionStatus::Completed;
        self.finish();
        true
    }

    /// RUNNING -> FAILED, capturing error detail and the failing step.
    pub fn fail(
        &mut self,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
        error_step_id: Option<Uuid>,
    ) -> bool {
        if self.status != ExecutionStatus::Running {
            return false;
        }
        self.status = ExecutionStatus::Failed;
        self.error_message = Some(message.into());
        self.error_details = details;
        self.error_step_id = error_step_id;
        self.finish();
        true
    }

    /// PENDING or RUNNING -> CANCELLED. No-op on terminal states.
    pub fn cancel(&mut self) -> bool {
        if !self.status.is_active() {
            return false;
        }
        let was_running = self.status == ExecutionStatus::Running;
        self.status = ExecutionStatus::Cancelled;
        if was_running {
            self.finish();
        }
        true
    }

    /// Any active state -> TIMEOUT. Driven by the external deadline check.
    pub fn timeout(&mut self) -> bool {
        if !self.status.is_active() {
            return false;
        }
        let was_running = self.status == ExecutionStatus::Running;
        self.status = ExecutionStatus::Timeout;
        if was_running {
            self.finish();
        }
        true
    }

    /// Whether the deadline has passed for a still-active execution.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status.is_active() && self.timeout_at.is_some_and(|deadline| now > deadline)
    }

    /// The single predicate gating retry eligibility.
    pub fn can_retry(&self) -> bool {
        matches!(
            self.status,
            ExecutionStatus::Failed | ExecutionStatus::Timeout
        ) && self.retry_attempt < self.max_retry_attempts
    }

    /// FAILED/TIMEOUT -> RETRY_PENDING, incrementing the attempt counter.
    ///
    /// No-op unless [`FlowExecution::can_retry`] holds, so the counter can
    /// never exceed the budget.
    pub fn mark_for_retry(&mut self) -> bool {
        if !self.can_retry() {
            return false;
        }
        self.status = ExecutionStatus::RetryPending;
        self.retry_attempt += 1;
        true
    }

    /// Create the child execution for a retry of this run.
    ///
    /// Carries the lineage (parent ID, attempt number, budget) and keeps the
    /// correlation ID so the whole retry chain is traceable.
    pub fn retry_child(&self) -> Self {
        let mut child = FlowExecution::new(
            self.deployment_id,
            self.flow_id,
            self.flow_name.clone(),
            TriggerType::Retry,
        )
        .with_correlation_id(self.correlation_id.clone())
        .with_retry_budget(self.max_retry_attempts)
        .with_priority(self.priority);
        child.retry_attempt = self.retry_attempt;
        child.parent_execution_id = Some(self.id);
        child.payload = self.payload.clone();
        child.files_expected = self.files_expected;
        child
    }

    /// Accumulate per-run file and byte counters.
    pub fn record_file_activity(&mut self, files: u64, bytes: u64) {
        self.files_processed += files;
        self.bytes_transferred += bytes;
    }

    /// Derived progress percentage; never authoritative state.
    pub fn progress_percent(&self) -> u8 {
        match self.status {
            ExecutionStatus::Pending => 0,
            ExecutionStatus::Running => 25 + self.scaled_progress(65),
            ExecutionStatus::Completed => 100,
            ExecutionStatus::Failed | ExecutionStatus::Cancelled | ExecutionStatus::Timeout => {
                50 + self.scaled_progress(45)
            }
            ExecutionStatus::RetryPending => 10,
        }
    }

    fn scaled_progress(&self, range: u8) -> u8 {
        match self.files_expected {
            Some(expected) if expected > 0 => {
                let ratio = (self.files_processed as f64 / expected as f64).min(1.0);
                (ratio * range as f64) as u8
            }
            _ => 0,
        }
    }

    fn finish(&mut self) {
        let now = Utc::now();
        self.completed_at = Some(now);
        if let Some(started_at) = self.started_at {
            self.duration_ms = Some((now - started_at).num_milliseconds());
        }
    }
}
