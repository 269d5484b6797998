pub mod aggregation;
pub mod assembly;
pub mod cli;
pub mod config;
pub mod data;
pub mod defaults;
pub mod error;
pub mod filter;
pub mod range;
pub mod reporting;
pub mod stats;
pub mod store;
pub mod summary;

// Test helpers module - made public for use in unit tests, integration tests, and benchmarks
// This is conditionally compiled to avoid including test code in release builds
#[doc(hidden)]
#[cfg(any(test, doctest, feature = "test-helpers"))]
pub mod test_helpers;
