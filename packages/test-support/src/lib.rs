//! Shared helpers for the integration test binaries.

pub mod test_logging;
pub mod unique;
