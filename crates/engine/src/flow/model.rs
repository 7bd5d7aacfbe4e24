//! Integration flow entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Rolling execution counters attached to a flow.
///
/// Immutable value: [`ExecutionMetrics::record`] returns the updated copy,
/// so concurrent updates race at the swap, not inside field mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetrics {
    pub total_executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    /// Exponentially smoothed average duration in milliseconds.
    pub average_duration_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_execution_at: Option<DateTime<Utc>>,
}

impl ExecutionMetrics {
    /// Fold one finished execution into the metrics.
    ///
    /// The first sample sets the average directly; later samples are
    /// smoothed as `avg * 0.8 + duration * 0.2`.
    #[must_use]
    pub fn record(&self, duration_ms: u64, success: bool) -> Self {
        let average_duration_ms = if self.total_executions == 0 {
            duration_ms as f64
        } else {
            self.average_duration_ms * 0.8 + duration_ms as f64 * 0.2
        };
        Self {
            total_executions: self.total_executions + 1,
            successful_executions: self.successful_executions + u64::from(success),
            failed_executions: self.failed_executions + u64::from(!success),
            average_duration_ms,
            last_execution_at: Some(Utc::now()),
        }
    }

    /// Fraction of executions that succeeded, in `[0.0, 1.0]`.
    pub fn success_rate(&self) -> f64 {
        if self.total_executions == 0 {
            return 0.0;
        }
        self.successful_executions as f64 / self.total_executions as f64
    }
}

/// Cron configuration for a flow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSettings {
    /// Whether the flow auto-runs on schedule.
    #[serde(default)]
    pub enabled: bool,

    /// Six-field cron expression (second minute hour day month day-of-week).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron_expression: Option<String>,

    /// Informational timezone label. Evaluation is UTC.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    /// Next computed run time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_run_at: Option<DateTime<Utc>>,
}

impl ScheduleSettings {
    /// Enabled schedule with the given cron expression.
    pub fn cron(expression: impl Into<String>) -> Self {
        Self {
            enabled: true,
            cron_expression: Some(expression.into()),
            timezone: None,
            next_run_at: None,
        }
    }

    /// Copy with an updated next run time.
    #[must_use]
    pub fn with_next_run(&self, next_run_at: DateTime<Utc>) -> Self {
        Self {
            next_run_at: Some(next_run_at),
            ..self.clone()
        }
    }
}

/// Retry policy for failed executions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    10000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryPolicy {
    /// Backoff delay before the given retry attempt (1-based), capped at
    /// `max_delay_ms`.
    pub fn delay_for_attempt(&self, attempt: u32) -> std::time::Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let delay =
            self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent as i32);
        std::time::Duration::from_millis((delay as u64).min(self.max_delay_ms))
    }
}

/// Direction of data movement the flow implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowType {
    /// Pulls data in from an external endpoint.
    Inbound,
    /// Pushes data out to an external endpoint.
    Outbound,
    /// Moves data both ways.
    Bidirectional,
}

impl std::fmt::Display for FlowType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowType::Inbound => write!(f, "inbound"),
            FlowType::Outbound => write!(f, "outbound"),
            FlowType::Bidirectional => write!(f, "bidirectional"),
        }
    }
}

/// Bundle of everything needed to run a flow.
///
/// The `definition` payload is opaque configuration consumed by the step
/// graph collaborator, not interpreted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowConfiguration {
    pub definition: serde_json::Value,
    pub flow_type: FlowType,

    #[serde(default = "default_max_parallel")]
    pub max_parallel_executions: u32,

    #[serde(default = "default_timeout_minutes")]
    pub timeout_minutes: u32,

    #[serde(default)]
    pub retry_policy: RetryPolicy,

    #[serde(default)]
    pub schedule: ScheduleSettings,
}

fn default_max_parallel() -> u32 {
    1
}

fn default_timeout_minutes() -> u32 {
    60
}

impl FlowConfiguration {
    pub fn new(definition: serde_json::Value, flow_type: FlowType) -> Self {
        Self {
            definition,
            flow_type,
            max_parallel_executions: default_max_parallel(),
            timeout_minutes: default_timeout_minutes(),
            retry_policy: RetryPolicy::default(),
            schedule: ScheduleSettings::default(),
        }
    }

    pub fn with_schedule(mut self, schedule: ScheduleSettings) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_max_parallel(mut self, max_parallel_executions: u32) -> Self {
        self.max_parallel_executions = max_parallel_executions;
        self
    }

    pub fn with_timeout_minutes(mut self, timeout_minutes: u32) -> Self {
        self.timeout_minutes = timeout_minutes;
        self
    }
}

/// Versioned definition of a flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationFlow {
    pub id: Uuid,
    pub name: String,
    /// Monotonic; bumped on every definition change, never decreased.
    pub version: u32,
    pub config: FlowConfiguration,
    #[serde(default)]
    pub metrics: ExecutionMetrics,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IntegrationFlow {
    pub fn new(name: impl Into<String>, config: FlowConfiguration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            version: 1,
            config,
            metrics: ExecutionMetrics::default(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the definition payload, bumping the version.
    pub fn update_definition(&mut self, definition: serde_json::Value) {
        self.config.definition = definition;
        self.version += 1;
        self.updated_at = Utc::now();
    }

    /// Fold one finished execution into the flow's metrics.
    pub fn record_execution(&mut self, duration_ms: u64, success: bool) {
        self.metrics = self.metrics.record(duration_ms, success);
        self.updated_at = Utc::now();
    }

    pub fn activate(&mut self) {
        self.active = true;
        self.updated_at = Utc::now();
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.updated_at = Utc::now();
    }

    /// Inactive flows may not be deployed.
    pub fn can_deploy(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FlowConfiguration {
        FlowConfiguration::new(serde_json::json!({"steps": []}), FlowType::Inbound)
    }

    #[test]
    fn test_metrics_first_sample_sets_average() {
        let metrics = ExecutionMetrics::default().record(1000, true);
        assert_eq!(metrics.total_executions, 1);
        assert_eq!(metrics.successful_executions, 1);
        assert_eq!(metrics.average_duration_ms, 1000.0);
    }

    #[test]
    fn test_metrics_smoothing() {
        let metrics = ExecutionMetrics::default().record(1000, true).record(500, false);
        assert_eq!(metrics.total_executions, 2);
        assert_eq!(metrics.failed_executions, 1);
        // 1000 * 0.8 + 500 * 0.2
        assert_eq!(metrics.average_duration_ms, 900.0);
    }

    #[test]
    fn test_metrics_success_rate() {
        assert_eq!(ExecutionMetrics::default().success_rate(), 0.0);
        let metrics = ExecutionMetrics::default()
            .record(100, true)
            .record(100, true)
            .record(100, false)
            .record(100, true);
        assert_eq!(metrics.success_rate(), 0.75);
    }

    #[test]
    fn test_retry_policy_backoff_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(1).as_millis(), 500);
        assert_eq!(policy.delay_for_attempt(2).as_millis(), 1000);
        assert_eq!(policy.delay_for_attempt(3).as_millis(), 2000);
        // 500 * 2^9 = 256000, capped at 10000
        assert_eq!(policy.delay_for_attempt(10).as_millis(), 10000);
    }

    #[test]
    fn test_flow_version_bumps_monotonically() {
        let mut flow = IntegrationFlow::new("orders-in", config());
        assert_eq!(flow.version, 1);
        flow.update_definition(serde_json::json!({"steps": [1]}));
        flow.update_definition(serde_json::json!({"steps": [1, 2]}));
        assert_eq!(flow.version, 3);
    }

    #[test]
    fn test_inactive_flow_cannot_deploy() {
        let mut flow = IntegrationFlow::new("orders-in", config());
        assert!(flow.can_deploy());
        flow.deactivate();
        assert!(!flow.can_deploy());
        flow.activate();
        assert!(flow.can_deploy());
    }

    #[test]
    fn test_schedule_with_next_run_keeps_expression() {
        let schedule = ScheduleSettings::cron("0 30 14 * * ?");
        let next = Utc::now();
        let updated = schedule.with_next_run(next);
        assert_eq!(updated.cron_expression.as_deref(), Some("0 30 14 * * ?"));
        assert_eq!(updated.next_run_at, Some(next));
        assert!(updated.enabled);
    }
}
