//! Logging setup shared by the binaries.

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber. `RUST_LOG` takes precedence over `default_filter`.
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging(default_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
