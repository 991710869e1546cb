//! Structured logging setup.
//!
//! All crates log through `tracing`; this module wires the subscriber once
//! at process start. The filter honors `RUST_LOG` when set.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// `default_directive` is used when `RUST_LOG` is not set (e.g. `"info"` or
/// `"screenmatch_recs=debug,info"`). Safe to call more than once: subsequent
/// calls are no-ops, which keeps test binaries from panicking.
pub fn init_logging(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
    {
        tracing::debug!("logging initialized");
    }
}
