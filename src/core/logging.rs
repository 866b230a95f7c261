//! Diagnostic logging on stderr; stdout is reserved for command results.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "QRFORGE_LOG";

pub fn init(verbose: bool) {
    let default_directive = if verbose { "qrforge=debug" } else { "qrforge=info" };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
