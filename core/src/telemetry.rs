// Logging bootstrap shared by binaries and tests
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber: fmt output filtered by `RUST_LOG`
/// (falling back to `info`). Safe to call more than once; later calls are
/// no-ops.
pub fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init();
}
