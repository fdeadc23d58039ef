//! Structured logging setup.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "prometheus_deadline_queue=info";

/// Install a `fmt` subscriber driven by `RUST_LOG`, falling back to
/// `prometheus_deadline_queue=info`. No-op if a global subscriber exists.
pub fn init_tracing() {
    init_tracing_with(DEFAULT_FILTER);
}

/// Like [`init_tracing`] with a caller-chosen fallback directive.
pub fn init_tracing_with(default_filter: &str) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    // Thread names tell poller, dispatcher and consumer threads apart.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init();
}
