//! Core functionality for the SecuraCV Canary state engine.
//!
//! This crate provides the shared error type, structured logging
//! initialization, configuration loading and time helpers used by the
//! eFuse verifier and the telemetry engine.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{Config, HealthThresholds, LoggingConfig, TelemetryConfig, VerifierConfig};
pub use error::{CoreError, Result};

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current timestamp in milliseconds since the Unix epoch.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}
