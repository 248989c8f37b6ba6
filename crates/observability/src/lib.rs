//! Tracing setup shared by binaries and tests that use `valwrap`.

/// Initialize process-wide tracing.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Initialize tracing for a test binary (human-readable, captured per test).
pub fn init_test() {
    tracing::init_test();
}

/// Subscriber configuration (filters, layers).
pub mod tracing;
