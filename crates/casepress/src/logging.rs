//! Tracing initialization.
//!
//! Bridges `log` macros into `tracing` and installs a fmt subscriber with
//! an env-overridable filter (`RUST_LOG`).

use tracing_subscriber::EnvFilter;

/// Initializes the global subscriber. Safe to call more than once — later
/// calls are no-ops, which keeps test setups simple.
pub fn init(default_filter: &str) {
    let _ = tracing_log::LogTracer::init();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
