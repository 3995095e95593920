//! Tracing setup.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber. Respects `RUST_LOG`,
/// defaulting to `info`. Safe to call more than once.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
