//! Shared tracing setup for ForgeCart binaries.

/// Initialize process-wide structured logging.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing subscriber configuration.
pub mod tracing;
