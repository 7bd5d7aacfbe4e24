//! Tracing initialization for embedders.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Respects `RUST_LOG`; defaults to `info` with engine debug output.
/// Safe to call more than once (later calls are no-ops).
pub fn init() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,flowgate_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
