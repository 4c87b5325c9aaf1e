//! Core error types

use thiserror::Error;

/// Core error type for the Canary engine
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration is present but unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed
    #[cfg(feature = "toml")]
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
