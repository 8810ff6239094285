//! Tracing/logging (shared setup).

/// Tracing configuration (filters, layers).
pub mod tracing;

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Observability setup for test binaries.
pub fn init_for_tests() {
    tracing::init_for_tests();
}
