//! Subscriber initialization.
//!
//! `valwrap-core` only emits `debug` events (rejected candidates, legacy
//! payloads, rolled-back batches), so the default `info` filter keeps them
//! quiet. Set `RUST_LOG=valwrap_core=debug` to see them.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "info";

fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// JSON logs with timestamps, configurable via `RUST_LOG`.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(DEFAULT_FILTER))
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}

/// Plain-text logs routed through the test harness's captured output.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter("valwrap_core=debug"))
        .with_test_writer()
        .try_init();
}
