//! Integration tests across the Canary crates
//!
//! This test suite validates:
//! - Provisioning flow: configuration → eFuse verification → report
//! - Telemetry lifecycle: discovery, classification and latching end to end
//! - Concurrent dispatch from many producer threads

pub mod test_utils;

#[cfg(test)]
mod provisioning_tests;

#[cfg(test)]
mod telemetry_lifecycle_tests;

#[cfg(test)]
mod concurrency_tests;
