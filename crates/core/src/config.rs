//! Configuration management for the Canary engine.

use serde::{Deserialize, Serialize};
#[cfg(feature = "toml")]
use std::path::Path;

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub telemetry: TelemetryConfig,
    pub verifier: VerifierConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Leading topic segment(s) in `<prefix>/<device_id>/<category>`
    pub topic_prefix: String,
    pub thresholds: HealthThresholds,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            topic_prefix: "securacv".to_string(),
            thresholds: HealthThresholds::default(),
        }
    }
}

/// Thresholds for health-derived signals.
///
/// All comparisons are strict: a reading equal to a threshold is not a breach.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HealthThresholds {
    /// `free_heap` strictly below this raises the memory-critical tamper signal
    pub memory_critical_bytes: f64,
    /// Battery strictly below this makes the health status critical
    pub battery_critical_percent: f64,
    /// Battery strictly below this makes the health status a warning
    pub battery_warning_percent: f64,
    /// Free memory strictly below this makes the health status critical
    pub memory_free_critical_bytes: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            memory_critical_bytes: 10_000.0,    // 10 KB heap floor
            battery_critical_percent: 10.0,
            battery_warning_percent: 25.0,
            memory_free_critical_bytes: 1024.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VerifierConfig {
    /// Mode used when the CLI is not told which profile to expect
    pub default_mode: String,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            default_mode: "virgin".to_string(),
        }
    }
}

impl Config {
    #[cfg(feature = "toml")]
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self::default()
    }

    /// Reject configurations that would make classification meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.telemetry.topic_prefix.trim_matches('/').is_empty() {
            return Err(CoreError::Config(
                "telemetry.topic_prefix must not be empty".to_string(),
            ));
        }

        let t = &self.telemetry.thresholds;
        if t.battery_warning_percent < t.battery_critical_percent {
            return Err(CoreError::Config(format!(
                "battery_warning_percent ({}) is below battery_critical_percent ({})",
                t.battery_warning_percent, t.battery_critical_percent
            )));
        }
        if t.memory_critical_bytes < 0.0 || t.memory_free_critical_bytes < 0.0 {
            return Err(CoreError::Config(
                "memory thresholds must be non-negative".to_string(),
            ));
        }

        Ok(())
    }
}
