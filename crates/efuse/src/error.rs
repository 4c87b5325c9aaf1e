//! Error types for eFuse verification.
//!
//! Missing or malformed attribute values are never errors: they surface as
//! failed checks in the report. Errors here cover contract violations and
//! the inability to obtain any device data at all.

use thiserror::Error;

/// Errors that can occur around eFuse verification.
#[derive(Debug, Error)]
pub enum EfuseError {
    /// Verification mode outside the closed `virgin` / `locked` set
    #[error("Unknown verification mode: {0} (expected 'virgin' or 'locked')")]
    UnknownMode(String),

    /// Device data could not be read at all
    #[error("Device data unavailable: {0}")]
    InputUnavailable(String),

    /// Device data was read but is not an attribute map
    #[error("Invalid attribute input: {0}")]
    InvalidInput(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for eFuse operations.
pub type EfuseResult<T> = Result<T, EfuseError>;
