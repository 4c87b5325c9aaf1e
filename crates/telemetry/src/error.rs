//! Error types for the telemetry engine.
//!
//! Undecodable payloads are not errors: the classifier leaves prior signals
//! untouched and reports `applied == false`. Errors here are contract
//! violations by the caller.

use thiserror::Error;

/// Errors that can occur when routing telemetry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TelemetryError {
    /// Category string outside the closed set
    #[error("Unknown telemetry category: {0}")]
    UnknownCategory(String),

    /// Signal kind string outside the closed set
    #[error("Unknown signal kind: {0}")]
    UnknownSignalKind(String),

    /// Device identifiers must be non-empty
    #[error("Device id must not be empty")]
    EmptyDeviceId,

    /// Topic does not have the `<prefix>/<device_id>/<category>` shape
    #[error("Invalid topic '{topic}': {reason}")]
    InvalidTopic { topic: String, reason: String },
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
