use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing for a binary.
///
/// Default level: INFO with debug for this crate, override via RUST_LOG.
/// Safe to call more than once; later calls are ignored.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,spendalyzer=debug"));

    let stdout_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .try_init()
        .is_ok()
    {
        tracing::debug!("Tracing initialized");
    }
}
