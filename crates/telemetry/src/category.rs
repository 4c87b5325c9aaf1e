//! Closed sets of inbound telemetry categories and their sub-kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TelemetryError;

/// Inbound telemetry class, one per topic suffix published by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Connectivity / online status
    Status,
    /// Hash chain integrity
    Chain,
    /// General health report, also carries tamper indicators
    Health,
    /// Dedicated tamper events
    Tamper,
    /// Per-transport link health
    Transport,
    /// Mesh network status
    Mesh,
    /// Community alert network status
    Chirp,
    /// Witness record counters
    Counts,
    /// Witness events
    Events,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Status,
        Category::Chain,
        Category::Health,
        Category::Tamper,
        Category::Transport,
        Category::Mesh,
        Category::Chirp,
        Category::Counts,
        Category::Events,
    ];

    /// Topic suffix for this category
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Status => "status",
            Category::Chain => "chain",
            Category::Health => "health",
            Category::Tamper => "tamper",
            Category::Transport => "transport",
            Category::Mesh => "mesh",
            Category::Chirp => "chirp",
            Category::Counts => "counts",
            Category::Events => "events",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| TelemetryError::UnknownCategory(s.to_string()))
    }
}

/// Tamper subtypes tracked as individual latching signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TamperKind {
    PowerLoss,
    SdRemove,
    SdError,
    GpsJamming,
    Motion,
    Enclosure,
    Gpio,
    Watchdog,
    UnexpectedReboot,
    MemoryCritical,
}

impl TamperKind {
    pub const ALL: [TamperKind; 10] = [
        TamperKind::PowerLoss,
        TamperKind::SdRemove,
        TamperKind::SdError,
        TamperKind::GpsJamming,
        TamperKind::Motion,
        TamperKind::Enclosure,
        TamperKind::Gpio,
        TamperKind::Watchdog,
        TamperKind::UnexpectedReboot,
        TamperKind::MemoryCritical,
    ];

    /// Wire name used in the `type` field of tamper events
    pub fn as_str(&self) -> &'static str {
        match self {
            TamperKind::PowerLoss => "power_loss",
            TamperKind::SdRemove => "sd_remove",
            TamperKind::SdError => "sd_error",
            TamperKind::GpsJamming => "gps_jamming",
            TamperKind::Motion => "motion",
            TamperKind::Enclosure => "enclosure",
            TamperKind::Gpio => "gpio",
            TamperKind::Watchdog => "watchdog",
            TamperKind::UnexpectedReboot => "unexpected_reboot",
            TamperKind::MemoryCritical => "memory_critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        TamperKind::ALL.iter().copied().find(|k| k.as_str() == s)
    }
}

impl fmt::Display for TamperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Communication paths a device may use to get witness data out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    WifiAp,
    WifiSta,
    Mqtt,
    Ble,
    Mesh,
    Chirp,
}

impl TransportKind {
    pub const ALL: [TransportKind; 6] = [
        TransportKind::WifiAp,
        TransportKind::WifiSta,
        TransportKind::Mqtt,
        TransportKind::Ble,
        TransportKind::Mesh,
        TransportKind::Chirp,
    ];

    /// Key of this transport's entry in a transport report
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::WifiAp => "wifi_ap",
            TransportKind::WifiSta => "wifi_sta",
            TransportKind::Mqtt => "mqtt",
            TransportKind::Ble => "ble",
            TransportKind::Mesh => "mesh",
            TransportKind::Chirp => "chirp",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        TransportKind::ALL.iter().copied().find(|k| k.as_str() == s)
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
