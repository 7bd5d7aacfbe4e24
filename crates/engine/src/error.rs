//! Error types for the Flowgate engine.

use thiserror::Error;

use flowgate_adapters::AdapterError;

/// Engine-level errors.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Resource not found (flow, deployment, execution).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Validation error (state-machine guard, gate check, bad input).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Adapter dispatch error.
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// Encryption error (flow export envelope).
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        EngineError::Internal(err.to_string())
    }
}

impl From<envy::Error> for EngineError {
    fn from(err: envy::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl From<AdapterError> for EngineError {
    fn from(err: AdapterError) -> Self {
        EngineError::Dispatch(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = EngineError::NotFound("deployment 42".to_string());
        assert_eq!(err.to_string(), "Resource not found: deployment 42");
    }

    #[test]
    fn test_dispatch_error_from_adapter() {
        let err: EngineError = AdapterError::Execution("boom".to_string()).into();
        assert!(matches!(err, EngineError::Dispatch(_)));
        assert!(err.to_string().contains("boom"));
    }
}
