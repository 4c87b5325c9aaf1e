//! Telemetry state engine for SecuraCV Canary devices.
//!
//! Classifies a stream of per-device telemetry messages into durable
//! tamper, transport and health signals, and reports the first sighting of
//! every (device, category) pair exactly once so a host can create monitors.
//!
//! ```
//! use canary_telemetry::{Category, Dispatcher, SignalKind};
//!
//! let dispatcher = Dispatcher::default();
//! let dispatch = dispatcher
//!     .handle("canary-01", Category::Tamper, br#"{"type": "gpio"}"#)
//!     .unwrap();
//! assert!(dispatch.first_sighting);
//! assert!(dispatch.monitors.contains(&SignalKind::Tamper(canary_telemetry::TamperKind::Gpio)));
//! ```

pub mod category;
pub mod classifier;
pub mod discovery;
pub mod dispatcher;
pub mod error;
pub mod payload;
pub mod rules;
pub mod signal;
pub mod store;

pub use category::{Category, TamperKind, TransportKind};
pub use classifier::{Classification, TelemetryClassifier};
pub use discovery::DiscoveryRegistry;
pub use dispatcher::{Diagnostics, Dispatch, Dispatcher, DEFAULT_TOPIC_PREFIX};
pub use error::{TelemetryError, TelemetryResult};
pub use payload::{decode, DecodeError, Payload};
pub use rules::RuleSet;
pub use signal::{LatchClass, Signal, SignalKind, SignalUpdate, SignalValue};
pub use store::SignalStore;
