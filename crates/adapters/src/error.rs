//! Adapter execution error types.

use thiserror::Error;

use crate::descriptor::{AdapterType, Direction};

/// Errors that can occur while dispatching to or executing an adapter.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// No executor registered for the type/direction combination.
    #[error("No executor registered for adapter type '{adapter_type}' with direction '{direction}'")]
    Unsupported {
        adapter_type: AdapterType,
        direction: Direction,
    },

    /// Adapter is not active and may not be dispatched to.
    #[error("Adapter '{0}' is not active")]
    Inactive(String),

    /// Adapter configuration is invalid. Carries every violated constraint.
    #[error("Invalid adapter configuration: {}", .violations.join("; "))]
    Configuration { violations: Vec<String> },

    /// Adapter execution failed.
    #[error("Execution failed: {0}")]
    Execution(String),

    /// Adapter execution timed out.
    #[error("Execution timed out after {0} seconds")]
    Timeout(u64),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),
}

impl AdapterError {
    /// Build a configuration error from collected violations.
    ///
    /// Callers validate every constraint before constructing this so the
    /// message lists all of them, not just the first.
    pub fn configuration(violations: Vec<String>) -> Self {
        AdapterError::Configuration { violations }
    }
}

impl From<std::io::Error> for AdapterError {
    fn from(e: std::io::Error) -> Self {
        AdapterError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(e: serde_json::Error) -> Self {
        AdapterError::Json(e.to_string())
    }
}
