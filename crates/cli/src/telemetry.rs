//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Install the console subscriber. `RUST_LOG` takes precedence over `level`.
///
/// Logs go to stderr so stdout carries only command output. Calling this twice
/// is harmless; the second install is ignored.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
