//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

const VERBOSE_FILTER: &str = "mediaprobe=trace,mediaprobe_container=trace,mediaprobe_probe=trace";

/// Filter directive for `config`, ignoring `RUST_LOG`.
pub fn filter_directive(config: &LoggingConfig) -> String {
    if config.verbose {
        VERBOSE_FILTER.to_string()
    } else if config.filter.trim().is_empty() {
        LoggingConfig::default().filter
    } else {
        config.filter.clone()
    }
}

/// Install a global `fmt` subscriber.
///
/// `RUST_LOG` wins over the configured filter. Returns `false` when a
/// subscriber was already installed, which is not an error.
pub fn init(config: &LoggingConfig) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config)));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init()
        .is_ok()
}
