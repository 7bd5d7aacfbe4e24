//! Dispatch result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::descriptor::AdapterDescriptor;

/// Terminal status of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStatus {
    /// Executor returned successfully.
    Success,
    /// Executor raised or the dispatch was rejected.
    Failed,
    /// Executor exceeded its deadline.
    Timeout,
}

impl DispatchStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, DispatchStatus::Success)
    }
}

impl std::fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchStatus::Success => write!(f, "success"),
            DispatchStatus::Failed => write!(f, "failed"),
            DispatchStatus::Timeout => write!(f, "timeout"),
        }
    }
}

/// Outcome of one adapter dispatch.
///
/// Always carries adapter identity and timestamps; executor-specific output
/// is merged into `data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchResult {
    pub adapter_id: Uuid,
    pub adapter_name: String,
    pub status: DispatchStatus,

    /// Executor output, merged over the base result.
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,

    /// Whether the executor produced data worth handing to the next step.
    pub has_data: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// File names produced by the executor, when it reports them.
    #[serde(default)]
    pub output_files: Vec<String>,

    pub files_processed: u64,
    pub bytes_transferred: u64,

    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl DispatchResult {
    /// Base result for a dispatch that is about to run.
    pub fn started(descriptor: &AdapterDescriptor) -> Self {
        Self {
            adapter_id: descriptor.id,
            adapter_name: descriptor.name.clone(),
            status: DispatchStatus::Success,
            data: HashMap::new(),
            has_data: false,
            error: None,
            output_files: Vec::new(),
            files_processed: 0,
            bytes_transferred: 0,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Finish successfully, merging the executor's output map.
    ///
    /// Well-known keys (`files`, `files_processed`, `bytes_transferred`)
    /// are lifted into the typed counters as well as kept in `data`.
    pub fn completed(mut self, output: HashMap<String, serde_json::Value>) -> Self {
        if let Some(files) = output.get("files").and_then(|v| v.as_array()) {
            self.output_files = files
                .iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect();
        }
        if let Some(n) = output.get("files_processed").and_then(|v| v.as_u64()) {
            self.files_processed = n;
        } else {
            self.files_processed = self.output_files.len() as u64;
        }
        if let Some(n) = output.get("bytes_transferred").and_then(|v| v.as_u64()) {
            self.bytes_transferred = n;
        }
        self.has_data = !output.is_empty();
        self.data = output;
        self.status = DispatchStatus::Success;
        self.ended_at = Some(Utc::now());
        self
    }

    /// Structured failure result for a dispatch that raised.
    pub fn failed(descriptor: &AdapterDescriptor, message: impl Into<String>) -> Self {
        Self {
            adapter_id: descriptor.id,
            adapter_name: descriptor.name.clone(),
            status: DispatchStatus::Failed,
            data: HashMap::new(),
            has_data: false,
            error: Some(message.into()),
            output_files: Vec::new(),
            files_processed: 0,
            bytes_transferred: 0,
            started_at: Utc::now(),
            ended_at: Some(Utc::now()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{AdapterType, Direction};

    fn descriptor() -> AdapterDescriptor {
        AdapterDescriptor::new("out", AdapterType::File, Direction::Sender)
    }

    #[test]
    fn test_completed_lifts_counters() {
        let mut output = HashMap::new();
        output.insert("files".to_string(), serde_json::json!(["a.csv", "b.csv"]));
        output.insert("bytes_transferred".to_string(), serde_json::json!(2048));

        let result = DispatchResult::started(&descriptor()).completed(output);
        assert!(result.is_success());
        assert!(result.has_data);
        assert_eq!(result.output_files, vec!["a.csv", "b.csv"]);
        assert_eq!(result.files_processed, 2);
        assert_eq!(result.bytes_transferred, 2048);
        assert!(result.ended_at.is_some());
    }

    #[test]
    fn test_completed_empty_output_has_no_data() {
        let result = DispatchResult::started(&descriptor()).completed(HashMap::new());
        assert!(result.is_success());
        assert!(!result.has_data);
        assert_eq!(result.files_processed, 0);
    }

    #[test]
    fn test_failed_carries_identity_and_message() {
        let d = descriptor();
        let result = DispatchResult::failed(&d, "connection refused");
        assert_eq!(result.status, DispatchStatus::Failed);
        assert_eq!(result.adapter_id, d.id);
        assert_eq!(result.adapter_name, "out");
        assert_eq!(result.error.as_deref(), Some("connection refused"));
        assert!(!result.has_data);
        assert!(result.ended_at.is_some());
    }
}
