//! eFuse security profile verification for SecuraCV Canary devices.
//!
//! An ESP32-S3 is provisioned in two steps: it leaves the factory with every
//! security fuse at its default (`virgin`) and is burned into a hardened
//! configuration (`locked`). This crate checks a raw eFuse attribute dump
//! against one of those profiles and produces an immutable report.
//!
//! ```
//! use canary_efuse::{verify, AttributeMap, Mode};
//!
//! let report = verify(&AttributeMap::new(), Mode::Virgin, None);
//! assert!(!report.overall_pass);
//! ```

pub mod error;
pub mod report;
pub mod rules;
pub mod value;
pub mod verifier;

pub use error::{EfuseError, EfuseResult};
pub use rules::{rule_table, Expected, Literal, Mode, SecurityRule};
pub use value::{attributes_from_json, parse_attributes, AttributeMap, RawValue, NOT_FOUND};
pub use verifier::{
    verify, DeviceIdentity, SecuritySummary, SummaryEntry, VerificationCheck, VerificationReport,
    Verifier, TOOL_VERSION,
};
