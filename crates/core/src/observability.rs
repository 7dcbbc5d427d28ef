//! Structured logging for the gateway binaries.

use tracing_subscriber::EnvFilter;

/// Initialize JSON logging with `RUST_LOG`-style filtering. `default_level`
/// applies when no filter is set in the environment.
pub fn init_logging(service: &str, default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .init();

    tracing::info!(service, "logging initialized");
}
