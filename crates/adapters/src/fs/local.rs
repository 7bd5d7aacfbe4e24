//! Local filesystem sender and receiver.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::context::{DispatchContext, StepRef};
use crate::descriptor::{AdapterDescriptor, AdapterType, Direction};
use crate::error::AdapterError;
use crate::registry::AdapterExecutor;

/// Configuration for the local filesystem adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalFileConfig {
    /// Directory to read from (receiver) or write into (sender).
    pub path: String,

    /// File name suffix filter for the receiver (e.g. ".csv").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Create the target directory if missing (sender).
    #[serde(default = "default_create_dirs")]
    pub create_dirs: bool,

    /// Overwrite existing files (sender).
    #[serde(default = "default_overwrite")]
    pub overwrite: bool,
}

fn default_create_dirs() -> bool {
    true
}

fn default_overwrite() -> bool {
    true
}

impl LocalFileConfig {
    fn from_descriptor(descriptor: &AdapterDescriptor) -> Result<Self, AdapterError> {
        serde_json::from_value(descriptor.config.clone())
            .map_err(|e| AdapterError::configuration(vec![format!("invalid config: {}", e)]))
    }

    /// Check every constraint and collect all violations.
    fn violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if self.path.trim().is_empty() {
            violations.push("path must not be empty".to_string());
        }
        if let Some(pattern) = &self.pattern {
            if pattern.trim().is_empty() {
                violations.push("pattern must not be empty when set".to_string());
            }
            if pattern.contains('/') || pattern.contains('\\') {
                violations.push("pattern must not contain path separators".to_string());
            }
        }
        violations
    }

    fn matches(&self, file_name: &str) -> bool {
        match &self.pattern {
            Some(pattern) => file_name.ends_with(pattern.as_str()),
            None => true,
        }
    }
}

fn validate(descriptor: &AdapterDescriptor) -> Result<LocalFileConfig, AdapterError> {
    let config = LocalFileConfig::from_descriptor(descriptor)?;
    let violations = config.violations();
    if violations.is_empty() {
        Ok(config)
    } else {
        Err(AdapterError::configuration(violations))
    }
}

/// Writes staged file contents into a target directory.
///
/// File contents come from the `files` context variable: a JSON object of
/// file name to string content, staged by the preceding step.
pub struct LocalFileSender;

impl LocalFileSender {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalFileSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AdapterExecutor for LocalFileSender {
    fn adapter_type(&self) -> AdapterType {
        AdapterType::File
    }

    fn direction(&self) -> Direction {
        Direction::Sender
    }

    async fn execute(
        &self,
        descriptor: &AdapterDescriptor,
        ctx: &DispatchContext,
        _step: Option<&StepRef>,
    ) -> Result<HashMap<String, serde_json::Value>, AdapterError> {
        let config = validate(descriptor)?;
        let target = Path::new(&config.path);

        if config.create_dirs {
            tokio::fs::create_dir_all(target).await?;
        }

        let staged = match ctx.get_variable("files").and_then(|v| v.as_object()) {
            Some(staged) => staged.clone(),
            None => {
                return Err(AdapterError::Execution(
                    "No staged files in context variable 'files'".to_string(),
                ))
            }
        };

        let mut written = Vec::new();
        let mut bytes: u64 = 0;
        for (name, content) in &staged {
            let content = content.as_str().ok_or_else(|| {
                AdapterError::Execution(format!("Staged file '{}' is not a string", name))
            })?;
            let destination = target.join(name);
            if !config.overwrite && tokio::fs::try_exists(&destination).await? {
                return Err(AdapterError::Execution(format!(
                    "Destination file '{}' already exists",
                    destination.display()
                )));
            }
            tokio::fs::write(&destination, content.as_bytes()).await?;
            bytes += content.len() as u64;
            written.push(name.clone());
        }
        written.sort();

        debug!(
            adapter = %descriptor.name,
            correlation_id = %ctx.correlation_id,
            files = written.len(),
            bytes,
            "Local file sender wrote files"
        );

        let mut output = HashMap::new();
        output.insert("files".to_string(), serde_json::json!(written));
        output.insert("bytes_transferred".to_string(), serde_json::json!(bytes));
        output.insert("path".to_string(), serde_json::json!(config.path));
        Ok(output)
    }

    fn validate_configuration(&self, descriptor: &AdapterDescriptor) -> Result<(), AdapterError> {
        validate(descriptor).map(|_| ())
    }
}

/// Collects files from a source directory.
///
/// Returns matched file names, their contents and total size; does not
/// delete or move the originals.
pub struct LocalFileReceiver;

impl LocalFileReceiver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalFileReceiver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AdapterExecutor for LocalFileReceiver {
    fn adapter_type(&self) -> AdapterType {
        AdapterType::File
    }

    fn direction(&self) -> Direction {
        Direction::Receiver
    }

    async fn execute(
        &self,
        descriptor: &AdapterDescriptor,
        ctx: &DispatchContext,
        _step: Option<&StepRef>,
    ) -> Result<HashMap<String, serde_json::Value>, AdapterError> {
        let config = validate(descriptor)?;

        let mut entries = tokio::fs::read_dir(&config.path).await?;
        let mut names = Vec::new();
        let mut contents = serde_json::Map::new();
        let mut bytes: u64 = 0;

        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if !config.matches(&name) {
                continue;
            }
            let content = tokio::fs::read_to_string(entry.path()).await?;
            bytes += metadata.len();
            contents.insert(name.clone(), serde_json::json!(content));
            names.push(name);
        }
        names.sort();

        debug!(
            adapter = %descriptor.name,
            correlation_id = %ctx.correlation_id,
            files = names.len(),
            bytes,
            "Local file receiver collected files"
        );

        let mut output = HashMap::new();
        output.insert("files".to_string(), serde_json::json!(names));
        output.insert(
            "contents".to_string(),
            serde_json::Value::Object(contents),
        );
        output.insert("bytes_transferred".to_string(), serde_json::json!(bytes));
        output.insert("path".to_string(), serde_json::json!(config.path));
        Ok(output)
    }

    fn validate_configuration(&self, descriptor: &AdapterDescriptor) -> Result<(), AdapterError> {
        validate(descriptor).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receiver_descriptor(path: &str, pattern: Option<&str>) -> AdapterDescriptor {
        AdapterDescriptor::new("inbox", AdapterType::File, Direction::Receiver).with_config(
            serde_json::json!({
                "path": path,
                "pattern": pattern,
            }),
        )
    }

    fn sender_descriptor(path: &str) -> AdapterDescriptor {
        AdapterDescriptor::new("outbox", AdapterType::File, Direction::Sender)
            .with_config(serde_json::json!({ "path": path }))
    }

    #[tokio::test]
    async fn test_receiver_collects_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.csv"), "1,2,3").unwrap();
        std::fs::write(dir.path().join("b.csv"), "4,5").unwrap();
        std::fs::write(dir.path().join("skip.txt"), "no").unwrap();

        let descriptor =
            receiver_descriptor(dir.path().to_str().unwrap(), Some(".csv"));
        let ctx = DispatchContext::new("corr-r");
        let output = LocalFileReceiver::new()
            .execute(&descriptor, &ctx, None)
            .await
            .unwrap();

        assert_eq!(
            output.get("files"),
            Some(&serde_json::json!(["a.csv", "b.csv"]))
        );
        assert_eq!(output.get("bytes_transferred"), Some(&serde_json::json!(8)));
    }

    #[tokio::test]
    async fn test_sender_writes_staged_files() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out");
        let descriptor = sender_descriptor(target.to_str().unwrap());

        let mut ctx = DispatchContext::new("corr-s");
        ctx.set_variable(
            "files",
            serde_json::json!({"report.txt": "hello", "data.csv": "a,b"}),
        );

        let output = LocalFileSender::new()
            .execute(&descriptor, &ctx, None)
            .await
            .unwrap();

        assert_eq!(
            output.get("files"),
            Some(&serde_json::json!(["data.csv", "report.txt"]))
        );
        assert_eq!(
            std::fs::read_to_string(target.join("report.txt")).unwrap(),
            "hello"
        );
    }

    #[tokio::test]
    async fn test_sender_without_staged_files_fails() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = sender_descriptor(dir.path().to_str().unwrap());
        let ctx = DispatchContext::new("corr-e");

        let err = LocalFileSender::new()
            .execute(&descriptor, &ctx, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Execution(_)));
    }

    #[test]
    fn test_validation_collects_all_violations() {
        let descriptor = AdapterDescriptor::new("bad", AdapterType::File, Direction::Receiver)
            .with_config(serde_json::json!({"path": "", "pattern": "sub/dir"}));

        let err = LocalFileReceiver::new()
            .validate_configuration(&descriptor)
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("path must not be empty"));
        assert!(message.contains("path separators"));
    }

    #[test]
    fn test_validation_accepts_minimal_config() {
        let descriptor = receiver_descriptor("/data/in", None);
        assert!(LocalFileReceiver::new()
            .validate_configuration(&descriptor)
            .is_ok());
    }
}
