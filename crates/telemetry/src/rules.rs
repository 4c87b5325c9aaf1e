//! Classification rule set: per category, an ordered list of rules mapping a
//! decoded payload to signal readings.
//!
//! Rules are data. Each one names the signal it feeds, how to compute the
//! reading from the payload, and which payload fields to copy into the
//! signal's attributes.

use canary_core::HealthThresholds;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::category::{Category, TamperKind, TransportKind};
use crate::payload::{as_number, as_token, is_truthy, lookup_path, ONLINE_TOKENS};
use crate::signal::{Attributes, SignalKind, SignalUpdate, SignalValue};

/// Alternate dotted paths for one logical field. The first path present in
/// the payload wins, even when its value is null or falsy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup(Vec<String>);

impl Lookup {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(paths.into_iter().map(Into::into).collect())
    }

    pub fn one(path: impl Into<String>) -> Self {
        Self(vec![path.into()])
    }

    pub fn find<'a>(&self, object: &'a Map<String, Value>) -> Option<&'a Value> {
        self.0.iter().find_map(|path| lookup_path(object, path))
    }

    pub fn paths(&self) -> &[String] {
        &self.0
    }
}

/// Boolean test over a payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Holds for every payload
    Always,
    /// Field is truthy; `missing` when absent
    Truthy { lookup: Lookup, missing: bool },
    /// Field is truthy, or an object with at least one truthy member
    Asserted(Lookup),
    /// Field is present and falsy
    PresentFalsy(Lookup),
    /// Numeric field strictly above a bound
    Above(Lookup, f64),
    /// Numeric field strictly below a bound
    Below(Lookup, f64),
    /// Field matches one of the tokens (case-insensitive)
    OneOf(Lookup, Vec<String>),
    Any(Vec<Condition>),
    All(Vec<Condition>),
}

impl Condition {
    pub fn truthy(lookup: Lookup) -> Self {
        Condition::Truthy {
            lookup,
            missing: false,
        }
    }

    pub fn truthy_or(lookup: Lookup, missing: bool) -> Self {
        Condition::Truthy { lookup, missing }
    }

    pub fn equals(lookup: Lookup, token: &str) -> Self {
        Condition::OneOf(lookup, vec![token.to_ascii_lowercase()])
    }

    pub fn evaluate(&self, object: &Map<String, Value>) -> bool {
        match self {
            Condition::Always => true,
            Condition::Truthy { lookup, missing } => {
                lookup.find(object).map(is_truthy).unwrap_or(*missing)
            }
            Condition::Asserted(lookup) => match lookup.find(object) {
                Some(Value::Object(flags)) => flags.values().any(is_truthy),
                Some(value) => is_truthy(value),
                None => false,
            },
            Condition::PresentFalsy(lookup) => {
                lookup.find(object).map(|v| !is_truthy(v)).unwrap_or(false)
            }
            Condition::Above(lookup, bound) => lookup
                .find(object)
                .and_then(as_number)
                .map(|n| n > *bound)
                .unwrap_or(false),
            Condition::Below(lookup, bound) => lookup
                .find(object)
                .and_then(as_number)
                .map(|n| n < *bound)
                .unwrap_or(false),
            Condition::OneOf(lookup, tokens) => lookup
                .find(object)
                .and_then(as_token)
                .map(|t| tokens.iter().any(|candidate| *candidate == t))
                .unwrap_or(false),
            Condition::Any(conditions) => conditions.iter().any(|c| c.evaluate(object)),
            Condition::All(conditions) => conditions.iter().all(|c| c.evaluate(object)),
        }
    }
}

/// Bounds for the coarse health level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelBounds {
    pub battery_critical: f64,
    pub battery_warning: f64,
    pub memory_free_critical: f64,
}

/// How a rule turns a payload into a signal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    /// Boolean from a condition
    Flag(Condition),
    /// Link state of one transport entry: object → `connected`, bool → itself
    Link(String),
    /// Non-negative integer; zero when absent
    Count(Lookup),
    /// Text with a default when absent
    Text { lookup: Lookup, default: String },
    /// `healthy` / `warning` / `critical` from battery and free memory
    HealthLevel(LevelBounds),
    /// GPS fix type from the `gps` entry
    GpsFix,
}

impl Reading {
    /// Compute the value, or `None` to leave the signal untouched.
    pub fn read(&self, object: &Map<String, Value>) -> Option<SignalValue> {
        match self {
            Reading::Flag(condition) => Some(SignalValue::Flag(condition.evaluate(object))),
            Reading::Link(key) => match object.get(key.as_str()) {
                Some(Value::Object(entry)) => Some(SignalValue::Flag(
                    entry.get("connected").map(is_truthy).unwrap_or(false),
                )),
                Some(Value::Bool(b)) => Some(SignalValue::Flag(*b)),
                _ => None,
            },
            Reading::Count(lookup) => match lookup.find(object) {
                None => Some(SignalValue::Count(0)),
                Some(value) => to_count(value).map(SignalValue::Count),
            },
            Reading::Text { lookup, default } => Some(SignalValue::Text(
                lookup
                    .find(object)
                    .map(render_text)
                    .unwrap_or_else(|| default.clone()),
            )),
            Reading::HealthLevel(bounds) => {
                Some(SignalValue::Text(health_level(object, bounds).to_string()))
            }
            Reading::GpsFix => Some(SignalValue::Text(gps_fix(object))),
        }
    }
}

fn to_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Null => Some(0),
        _ => None,
    }
}

fn render_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn health_level(object: &Map<String, Value>, bounds: &LevelBounds) -> &'static str {
    let battery = object.get("battery").and_then(as_number).unwrap_or(100.0);
    // Missing free-memory readings are not treated as exhaustion; see the
    // health status decision in DESIGN.md
    let memory_low = object
        .get("memory_free")
        .and_then(as_number)
        .map(|m| m < bounds.memory_free_critical)
        .unwrap_or(false);

    if battery < bounds.battery_critical || memory_low {
        "critical"
    } else if battery < bounds.battery_warning {
        "warning"
    } else {
        "healthy"
    }
}

fn gps_fix(object: &Map<String, Value>) -> String {
    match object.get("gps") {
        Some(Value::Object(gps)) => gps
            .get("fix_type")
            .map(render_text)
            .unwrap_or_else(|| "no_fix".to_string()),
        Some(other) if is_truthy(other) => render_text(other),
        _ => "no_fix".to_string(),
    }
}

/// One payload field copied into a signal's attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSource {
    pub name: String,
    pub lookup: Lookup,
    pub default: Option<Value>,
}

/// A single classification rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub kind: SignalKind,
    pub reading: Reading,
    pub attributes: Vec<AttributeSource>,
}

impl Rule {
    pub fn new(kind: SignalKind, reading: Reading) -> Self {
        Self {
            kind,
            reading,
            attributes: Vec::new(),
        }
    }

    /// Copy `lookup` into attribute `name` when present.
    pub fn attr(mut self, name: &str, lookup: Lookup) -> Self {
        self.attributes.push(AttributeSource {
            name: name.to_string(),
            lookup,
            default: None,
        });
        self
    }

    /// Copy `lookup` into attribute `name`, falling back to `default`.
    pub fn attr_or(mut self, name: &str, lookup: Lookup, default: Value) -> Self {
        self.attributes.push(AttributeSource {
            name: name.to_string(),
            lookup,
            default: Some(default),
        });
        self
    }

    /// Evaluate against a payload object.
    pub fn evaluate(&self, object: &Map<String, Value>) -> Option<SignalUpdate> {
        let value = self.reading.read(object)?;
        let mut attributes = Attributes::new();
        for source in &self.attributes {
            let found = source.lookup.find(object).cloned().or_else(|| source.default.clone());
            if let Some(found) = found {
                attributes.insert(source.name.clone(), found);
            }
        }
        Some(SignalUpdate {
            kind: self.kind,
            value,
            attributes,
        })
    }
}

/// Rules for every category.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: HashMap<Category, Vec<Rule>>,
}

impl RuleSet {
    /// Standard Canary rule set with default thresholds
    pub fn new() -> Self {
        Self::with_thresholds(&HealthThresholds::default())
    }

    /// Standard Canary rule set with custom thresholds
    pub fn with_thresholds(thresholds: &HealthThresholds) -> Self {
        let rules = Category::ALL
            .iter()
            .map(|category| (*category, standard_rules(*category, thresholds)))
            .collect();
        Self { rules }
    }

    pub fn rules(&self, category: Category) -> &[Rule] {
        self.rules.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Signal kinds a category's rules may write.
    pub fn affected(&self, category: Category) -> Vec<SignalKind> {
        let mut kinds: Vec<SignalKind> = self.rules(category).iter().map(|r| r.kind).collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }

    /// Apply a category's rules in order.
    pub fn evaluate(&self, category: Category, object: &Map<String, Value>) -> Vec<SignalUpdate> {
        self.rules(category)
            .iter()
            .filter_map(|rule| rule.evaluate(object))
            .collect()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup(paths: &[&str]) -> Lookup {
    Lookup::new(paths.iter().copied())
}

/// Health fields that indicate each tamper kind.
pub fn health_tamper_condition(kind: TamperKind, thresholds: &HealthThresholds) -> Condition {
    let truthy = |paths: &[&str]| Condition::truthy(lookup(paths));
    let any = |paths: &[&[&str]]| Condition::Any(paths.iter().map(|p| truthy(p)).collect());

    match kind {
        TamperKind::SdRemove => Condition::PresentFalsy(Lookup::one("sd_mounted")),
        TamperKind::SdError => Condition::Above(Lookup::one("sd_errors"), 0.0),
        TamperKind::GpsJamming => any(&[&["gps_fix_lost"], &["gps_jamming"]]),
        TamperKind::Motion => any(&[&["tamper.motion"], &["unexpected_motion"]]),
        TamperKind::MemoryCritical => {
            Condition::Below(Lookup::one("free_heap"), thresholds.memory_critical_bytes)
        }
        TamperKind::Watchdog => truthy(&["watchdog_triggered"]),
        TamperKind::Gpio => any(&[&["tamper.gpio"], &["tamper_gpio"]]),
        TamperKind::UnexpectedReboot => truthy(&["unexpected_reboot"]),
        TamperKind::PowerLoss => truthy(&["power_loss_detected"]),
        TamperKind::Enclosure => any(&[&["tamper.enclosure"], &["enclosure_open"]]),
    }
}

fn standard_rules(category: Category, thresholds: &HealthThresholds) -> Vec<Rule> {
    match category {
        Category::Status => vec![Rule::new(
            SignalKind::Online,
            Reading::Flag(Condition::Any(vec![
                Condition::truthy(lookup(&["online", "connected"])),
                Condition::OneOf(
                    lookup(&["status", "state"]),
                    ONLINE_TOKENS.iter().map(|t| t.to_string()).collect(),
                ),
            ])),
        )],

        Category::Chain => vec![
            Rule::new(
                SignalKind::ChainValid,
                Reading::Flag(Condition::truthy_or(lookup(&["valid", "integrity"]), true)),
            )
            .attr_or("chain_length", lookup(&["length", "chain_length"]), Value::from(0))
            .attr_or("latest_hash", lookup(&["latest_hash"]), Value::from(""))
            .attr_or("verification_error", lookup(&["error"]), Value::Null),
            Rule::new(
                SignalKind::ChainLength,
                Reading::Count(lookup(&["length", "chain_length"])),
            )
            .attr_or("latest_hash", lookup(&["latest_hash"]), Value::from(""))
            .attr_or("algorithm", lookup(&["algorithm"]), Value::from("ed25519")),
        ],

        Category::Health => {
            let tamper_conditions: Vec<Condition> = TamperKind::ALL
                .iter()
                .map(|k| health_tamper_condition(*k, thresholds))
                .collect();

            // `tamper` is either a flag or an object of per-kind flags
            let mut any_sources =
                vec![Condition::Asserted(lookup(&["tamper_detected", "tamper"]))];
            any_sources.extend(tamper_conditions.iter().cloned());

            let mut rules = vec![Rule::new(
                SignalKind::AnyTamper,
                Reading::Flag(Condition::Any(any_sources)),
            )];
            rules.extend(TamperKind::ALL.iter().zip(tamper_conditions).map(|(kind, condition)| {
                Rule::new(SignalKind::Tamper(*kind), Reading::Flag(condition))
            }));

            rules.push(
                Rule::new(
                    SignalKind::HealthStatus,
                    Reading::HealthLevel(LevelBounds {
                        battery_critical: thresholds.battery_critical_percent,
                        battery_warning: thresholds.battery_warning_percent,
                        memory_free_critical: thresholds.memory_free_critical_bytes,
                    }),
                )
                .attr_or("battery_percent", lookup(&["battery"]), Value::from(100))
                .attr("memory_free_bytes", lookup(&["memory_free"]))
                .attr_or("uptime_seconds", lookup(&["uptime"]), Value::from(0))
                .attr_or("firmware_version", lookup(&["firmware_version"]), Value::from(""))
                .attr_or("public_key", lookup(&["public_key"]), Value::from("")),
            );
            rules.push(
                Rule::new(SignalKind::GpsFix, Reading::GpsFix)
                    .attr("satellites", lookup(&["gps.satellites"]))
                    .attr("hdop", lookup(&["gps.hdop"]))
                    .attr("latitude", lookup(&["gps.latitude"]))
                    .attr("longitude", lookup(&["gps.longitude"])),
            );
            rules
        }

        Category::Tamper => {
            let mut rules = vec![Rule::new(
                SignalKind::AnyTamper,
                Reading::Flag(Condition::Always),
            )
            .attr_or("tamper_type", lookup(&["type"]), Value::from("unknown"))
            .attr_or("timestamp", lookup(&["timestamp"]), Value::from(""))
            .attr_or("detail", lookup(&["detail"]), Value::from(""))];

            rules.extend(TamperKind::ALL.iter().map(|kind| {
                Rule::new(
                    SignalKind::Tamper(*kind),
                    Reading::Flag(Condition::Any(vec![
                        Condition::equals(Lookup::one("type"), kind.as_str()),
                        Condition::truthy(Lookup::one(kind.as_str())),
                    ])),
                )
                .attr_or("detail", lookup(&["detail"]), Value::from(""))
                .attr_or("severity", lookup(&["severity"]), Value::from("tamper"))
            }));
            rules
        }

        Category::Transport => TransportKind::ALL
            .iter()
            .map(|kind| {
                let field = |name: &str| Lookup::one(format!("{}.{}", kind, name));
                Rule::new(
                    SignalKind::Transport(*kind),
                    Reading::Link(kind.as_str().to_string()),
                )
                .attr("rssi", field("rssi"))
                .attr("message_count", field("messages"))
                .attr("error_count", field("errors"))
                .attr("last_activity", field("last_activity"))
            })
            .collect(),

        Category::Mesh => vec![Rule::new(
            SignalKind::MeshConnected,
            Reading::Flag(Condition::Above(lookup(&["peer_count", "peers"]), 0.0)),
        )
        .attr("peer_count", lookup(&["peer_count"]))
        .attr_or("peers", lookup(&["peers"]), Value::Array(Vec::new()))
        .attr_or("messages_sent", lookup(&["sent"]), Value::from(0))
        .attr_or("messages_received", lookup(&["received"]), Value::from(0))
        .attr_or("relay_count", lookup(&["relayed"]), Value::from(0))],

        Category::Chirp => vec![Rule::new(
            SignalKind::ChirpActive,
            Reading::Flag(Condition::All(vec![
                Condition::truthy(lookup(&["enabled"])),
                Condition::truthy(lookup(&["ready"])),
            ])),
        )
        .attr_or("session_emoji", lookup(&["session_id"]), Value::from(""))
        .attr_or("cooldown_tier", lookup(&["cooldown_tier"]), Value::from(0))
        .attr_or("presence_minutes", lookup(&["presence_minutes"]), Value::from(0))
        .attr_or("can_broadcast", lookup(&["can_broadcast"]), Value::from(false))
        .attr_or("alerts_sent", lookup(&["sent"]), Value::from(0))
        .attr_or("alerts_received", lookup(&["received"]), Value::from(0))
        .attr_or("confirmations_given", lookup(&["confirmed"]), Value::from(0))],

        Category::Counts => vec![Rule::new(
            SignalKind::WitnessCount,
            Reading::Count(lookup(&["total", "count"])),
        )],

        Category::Events => vec![Rule::new(
            SignalKind::LastEvent,
            Reading::Text {
                lookup: lookup(&["event_type", "type"]),
                default: "unknown".to_string(),
            },
        )
        .attr_or("timestamp", lookup(&["timestamp"]), Value::from(""))
        .attr_or("zone", lookup(&["zone"]), Value::from(""))
        .attr_or("confidence", lookup(&["confidence"]), Value::from(""))
        .attr_or("signed", lookup(&["signed"]), Value::from(false))],
    }
}
