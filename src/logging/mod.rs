//! Logging init: `tracing` + `tracing-subscriber`, `RUST_LOG` driven.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Installs a global `tracing` subscriber. Call once, from the binary entry
/// point, before constructing any supervisor.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
