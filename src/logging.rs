//! Logging configuration using tracing
//!
//! Structured logging to stderr, filtered by the RUST_LOG environment variable.

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter,
};

/// Initialize the tracing subscriber
///
/// `default_directive` applies when RUST_LOG is unset or invalid, e.g.
/// `"info"` for the server and `"warn"` for the one-shot `compare` command.
///
/// # Example RUST_LOG values
/// - `RUST_LOG=debug` - show cache hits and upstream fetch sizes
/// - `RUST_LOG=mgnrega_dash=trace,tower=warn` - per-crate levels
///
/// # Errors
/// Returns an error if a global subscriber has already been installed
pub fn init(default_directive: &str) -> Result<(), TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true),
        )
        .try_init()
}

/// Initialize logging for tests (no-op if already initialized)
pub fn init_test() {
    let _ = init("debug");
}
