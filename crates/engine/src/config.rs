//! Engine configuration.

use serde::Deserialize;

use crate::error::EngineResult;

/// Engine configuration loaded from environment variables.
///
/// Environment variables are prefixed with `FLOWGATE_`:
/// - `FLOWGATE_ENGINE_NAME`: instance name used in logs
/// - `FLOWGATE_DEFAULT_TIMEOUT_MINUTES`: execution deadline when a flow
///   configuration carries none (default: 60)
/// - `FLOWGATE_DEFAULT_MAX_RETRY_ATTEMPTS`: retry budget fallback (default: 3)
/// - `FLOWGATE_SCHEDULE_SWEEP_INTERVAL`: seconds between scheduler sweeps
///   (default: 30)
/// - `FLOWGATE_DEBUG`: enable debug mode (default: false)
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Instance name for identification.
    #[serde(default = "default_engine_name")]
    pub engine_name: String,

    /// Execution timeout fallback in minutes.
    #[serde(default = "default_timeout_minutes")]
    pub default_timeout_minutes: u32,

    /// Retry budget fallback.
    #[serde(default = "default_max_retry_attempts")]
    pub default_max_retry_attempts: u32,

    /// Scheduler sweep interval in seconds.
    #[serde(default = "default_sweep_interval")]
    pub schedule_sweep_interval: u64,

    /// Enable debug mode.
    #[serde(default)]
    pub debug: bool,
}

fn default_engine_name() -> String {
    "flowgate-engine".to_string()
}

fn default_timeout_minutes() -> u32 {
    60
}

fn default_max_retry_attempts() -> u32 {
    3
}

fn default_sweep_interval() -> u64 {
    30
}

impl EngineConfig {
    /// Load configuration from `FLOWGATE_`-prefixed environment variables.
    pub fn from_env() -> EngineResult<Self> {
        Ok(envy::prefixed("FLOWGATE_").from_env::<EngineConfig>()?)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine_name: default_engine_name(),
            default_timeout_minutes: default_timeout_minutes(),
            default_max_retry_attempts: default_max_retry_attempts(),
            schedule_sweep_interval: default_sweep_interval(),
            debug: false,
        }
    }
}
