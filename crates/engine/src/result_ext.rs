//! Result extension trait for logging errors with context.

use std::fmt::Display;
use tracing::error;

/// Extension trait for logging errors with context.
///
/// Adds a `log` method to `Result` that records the error together with a
/// context message and the caller's source location, returning the result
/// unchanged.
pub trait ResultExt<T, E> {
    /// Log the error with context if this is an `Err` variant.
    fn log<S: ToString>(self, context: S) -> Result<T, E>;
}

impl<T, E: Display> ResultExt<T, E> for Result<T, E> {
    #[track_caller]
    fn log<S: ToString>(self, context: S) -> Result<T, E> {
        if let Err(ref e) = self {
            let caller_location = std::panic::Location::caller();
            error!(
                target: "flowgate_engine",
                error = %e,
                file = %format!("{}:{}", caller_location.file(), caller_location.line()),
                context = %context.to_string(),
                "Operation failed"
            );
        }
        self
    }
}
