//! Signals derived from telemetry and their latching behaviour.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::category::{Category, TamperKind, TransportKind};
use crate::error::TelemetryError;

/// Free-form attributes attached to a signal (RSSI, peer count, ...).
pub type Attributes = BTreeMap<String, Value>;

/// Every signal a device can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignalKind {
    Online,
    ChainValid,
    /// Aggregate of all tamper sources
    AnyTamper,
    Tamper(TamperKind),
    Transport(TransportKind),
    MeshConnected,
    ChirpActive,
    HealthStatus,
    GpsFix,
    ChainLength,
    WitnessCount,
    LastEvent,
}

/// How a new reading combines with the stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LatchClass {
    /// Once true, stays true; a false reading changes nothing
    Sticky,
    /// Replaced by every reading
    Instantaneous,
    /// Replaced by every reading, assumed valid until told otherwise
    Integrity,
}

impl SignalKind {
    /// Category whose first sighting creates the monitor for this signal
    pub fn owner(&self) -> Category {
        match self {
            SignalKind::Online => Category::Status,
            SignalKind::ChainValid | SignalKind::ChainLength => Category::Chain,
            SignalKind::AnyTamper | SignalKind::HealthStatus | SignalKind::GpsFix => {
                Category::Health
            }
            SignalKind::Tamper(_) => Category::Tamper,
            SignalKind::Transport(_) => Category::Transport,
            SignalKind::MeshConnected => Category::Mesh,
            SignalKind::ChirpActive => Category::Chirp,
            SignalKind::WitnessCount => Category::Counts,
            SignalKind::LastEvent => Category::Events,
        }
    }

    pub fn latch(&self) -> LatchClass {
        match self {
            SignalKind::AnyTamper | SignalKind::Tamper(_) => LatchClass::Sticky,
            SignalKind::ChainValid => LatchClass::Integrity,
            _ => LatchClass::Instantaneous,
        }
    }

    /// Signals owned by a category, in monitor creation order.
    pub fn owned_by(category: Category) -> Vec<SignalKind> {
        match category {
            Category::Status => vec![SignalKind::Online],
            Category::Chain => vec![SignalKind::ChainValid, SignalKind::ChainLength],
            Category::Health => vec![
                SignalKind::AnyTamper,
                SignalKind::HealthStatus,
                SignalKind::GpsFix,
            ],
            Category::Tamper => TamperKind::ALL.iter().map(|k| SignalKind::Tamper(*k)).collect(),
            Category::Transport => TransportKind::ALL
                .iter()
                .map(|k| SignalKind::Transport(*k))
                .collect(),
            Category::Mesh => vec![SignalKind::MeshConnected],
            Category::Chirp => vec![SignalKind::ChirpActive],
            Category::Counts => vec![SignalKind::WitnessCount],
            Category::Events => vec![SignalKind::LastEvent],
        }
    }

    /// Stable identifier, unique per device
    pub fn key(&self) -> String {
        match self {
            SignalKind::Online => "online".to_string(),
            SignalKind::ChainValid => "chain_valid".to_string(),
            SignalKind::AnyTamper => "tamper".to_string(),
            SignalKind::Tamper(kind) => format!("tamper_{}", kind),
            SignalKind::Transport(kind) => format!("transport_{}", kind),
            SignalKind::MeshConnected => "mesh_connected".to_string(),
            SignalKind::ChirpActive => "chirp_active".to_string(),
            SignalKind::HealthStatus => "health_status".to_string(),
            SignalKind::GpsFix => "gps_fix".to_string(),
            SignalKind::ChainLength => "chain_length".to_string(),
            SignalKind::WitnessCount => "witness_count".to_string(),
            SignalKind::LastEvent => "last_event".to_string(),
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl FromStr for SignalKind {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "online" => SignalKind::Online,
            "chain_valid" => SignalKind::ChainValid,
            "tamper" => SignalKind::AnyTamper,
            "mesh_connected" => SignalKind::MeshConnected,
            "chirp_active" => SignalKind::ChirpActive,
            "health_status" => SignalKind::HealthStatus,
            "gps_fix" => SignalKind::GpsFix,
            "chain_length" => SignalKind::ChainLength,
            "witness_count" => SignalKind::WitnessCount,
            "last_event" => SignalKind::LastEvent,
            other => {
                let sub = |prefix: &str| other.strip_prefix(prefix);
                if let Some(kind) = sub("tamper_").and_then(TamperKind::parse) {
                    SignalKind::Tamper(kind)
                } else if let Some(kind) = sub("transport_").and_then(TransportKind::parse) {
                    SignalKind::Transport(kind)
                } else {
                    return Err(TelemetryError::UnknownSignalKind(s.to_string()));
                }
            }
        };
        Ok(kind)
    }
}

impl Serialize for SignalKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Current value of a signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalValue {
    Flag(bool),
    Count(u64),
    Text(String),
}

impl SignalValue {
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            SignalValue::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_count(&self) -> Option<u64> {
        match self {
            SignalValue::Count(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SignalValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// A reading produced by one rule for one message.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalUpdate {
    pub kind: SignalKind,
    pub value: SignalValue,
    pub attributes: Attributes,
}

/// Stored state of one (device, kind) signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub device_id: String,
    pub kind: SignalKind,
    pub value: SignalValue,
    pub attributes: Attributes,
    /// Unix ms of the last message asserting a sticky flag
    pub last_triggered: Option<u64>,
    /// Unix ms of the last change applied
    pub updated_at: u64,
}

impl Signal {
    /// Materialize a signal from its first reading.
    ///
    /// A sticky signal first read as false is still created so that hosts
    /// see an explicit "clear" state.
    pub fn new(device_id: &str, update: SignalUpdate, now_ms: u64) -> Self {
        let triggered = update.kind.latch() == LatchClass::Sticky
            && update.value == SignalValue::Flag(true);
        Self {
            device_id: device_id.to_string(),
            kind: update.kind,
            value: update.value,
            attributes: update.attributes,
            last_triggered: triggered.then_some(now_ms),
            updated_at: now_ms,
        }
    }

    /// Fold a new reading into this signal according to its latch class.
    ///
    /// Returns true when the stored state changed.
    pub fn apply(&mut self, update: SignalUpdate, now_ms: u64) -> bool {
        match self.kind.latch() {
            LatchClass::Sticky => {
                if update.value != SignalValue::Flag(true) {
                    return false;
                }
                self.value = SignalValue::Flag(true);
                self.last_triggered = Some(now_ms);
                if !update.attributes.is_empty() {
                    self.attributes = update.attributes;
                }
            }
            LatchClass::Instantaneous | LatchClass::Integrity => {
                self.value = update.value;
                self.attributes = update.attributes;
            }
        }
        self.updated_at = now_ms;
        true
    }

    pub fn is_on(&self) -> bool {
        self.value.as_flag().unwrap_or(false)
    }
}
