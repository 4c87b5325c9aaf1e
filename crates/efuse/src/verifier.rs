//! eFuse verifier: raw attribute map + mode → verification report.
//!
//! Verification never fails as an operation. Missing, unreadable or
//! malformed attributes are recorded as failing checks, so an empty attribute
//! map simply produces a report in which every check failed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::rules::{
    is_secure_boot_digest, rule_table, Expected, Mode, SecurityRule, KEY_PURPOSE_SLOTS,
    SECURE_BOOT_DIGEST_CHECK, SECURE_BOOT_DIGEST_PURPOSE,
};
use crate::value::{AttributeMap, RawValue};

/// Version stamped into every report.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Identity snapshot of the device under test.
///
/// Opaque strings supplied by the caller; the verifier never interprets them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub chip_model: Option<String>,
    pub chip_revision: Option<String>,
    pub mac_address: Option<String>,
    pub chip_id: Option<String>,
}

impl DeviceIdentity {
    pub fn is_empty(&self) -> bool {
        self.chip_model.is_none()
            && self.chip_revision.is_none()
            && self.mac_address.is_none()
            && self.chip_id.is_none()
    }
}

/// Outcome of one rule against one attribute.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationCheck {
    pub name: String,
    pub description: String,
    pub expected: Expected,
    pub actual: RawValue,
    pub passed: bool,
}

/// Immutable result of one verification request.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub tool_version: String,
    pub generated_at: DateTime<Utc>,
    pub mode: Mode,
    pub identity: Option<DeviceIdentity>,
    pub checks: Vec<VerificationCheck>,
    pub overall_pass: bool,
    /// Every attribute as read, kept for the audit trail
    pub efuse_summary: AttributeMap,
}

impl VerificationReport {
    pub fn failures(&self) -> impl Iterator<Item = &VerificationCheck> {
        self.checks.iter().filter(|c| !c.passed)
    }

    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    pub fn check(&self, name: &str) -> Option<&VerificationCheck> {
        self.checks.iter().find(|c| c.name == name)
    }
}

/// One security attribute in an unverified summary.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryEntry {
    pub name: String,
    pub description: String,
    pub value: RawValue,
}

/// Security eFuse values of a device, read without a verification mode.
#[derive(Debug, Clone, Serialize)]
pub struct SecuritySummary {
    pub tool_version: String,
    pub generated_at: DateTime<Utc>,
    pub status: &'static str,
    pub identity: Option<DeviceIdentity>,
    /// Rule-table attributes in table order
    pub security: Vec<SummaryEntry>,
    pub efuse_summary: AttributeMap,
}

/// Verifies attribute maps against a rule table.
#[derive(Debug, Clone, Copy)]
pub struct Verifier {
    rules: &'static [SecurityRule],
}

impl Verifier {
    /// Create a verifier over the built-in ESP32-S3 rule table
    pub fn new() -> Self {
        Self::with_rules(rule_table())
    }

    /// Create a verifier over a custom rule table
    pub fn with_rules(rules: &'static [SecurityRule]) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &'static [SecurityRule] {
        self.rules
    }

    /// Verify `attributes` against the expectations of `mode`.
    pub fn verify(
        &self,
        attributes: &AttributeMap,
        mode: Mode,
        identity: Option<DeviceIdentity>,
    ) -> VerificationReport {
        let mut checks: Vec<VerificationCheck> = self
            .rules
            .iter()
            .map(|rule| evaluate_rule(rule, attributes, mode))
            .collect();

        if mode == Mode::Locked {
            checks.push(secure_boot_digest_check(attributes));
        }

        let overall_pass = checks.iter().all(|c| c.passed);
        let report = VerificationReport {
            tool_version: TOOL_VERSION.to_string(),
            generated_at: Utc::now(),
            mode,
            identity: identity.filter(|id| !id.is_empty()),
            checks,
            overall_pass,
            efuse_summary: attributes.clone(),
        };

        let failed = report.checks.len() - report.passed_count();
        if report.overall_pass {
            info!(mode = %mode, checks = report.checks.len(), "eFuse verification passed");
        } else {
            warn!(mode = %mode, failed, total = report.checks.len(), "eFuse verification failed");
        }

        report
    }
}

impl Verifier {
    /// Read the security attributes without checking them against a mode.
    pub fn summarize(
        &self,
        attributes: &AttributeMap,
        identity: Option<DeviceIdentity>,
    ) -> SecuritySummary {
        let security = self
            .rules
            .iter()
            .map(|rule| SummaryEntry {
                name: rule.name.to_string(),
                description: rule.description.to_string(),
                value: attributes.get(rule.name).cloned().unwrap_or(RawValue::NotFound),
            })
            .collect();

        debug!(attributes = attributes.len(), "eFuse summary read without verification");
        SecuritySummary {
            tool_version: TOOL_VERSION.to_string(),
            generated_at: Utc::now(),
            status: "info",
            identity: identity.filter(|id| !id.is_empty()),
            security,
            efuse_summary: attributes.clone(),
        }
    }
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Verify against the built-in rule table.
pub fn verify(
    attributes: &AttributeMap,
    mode: Mode,
    identity: Option<DeviceIdentity>,
) -> VerificationReport {
    Verifier::new().verify(attributes, mode, identity)
}

fn evaluate_rule(rule: &SecurityRule, attributes: &AttributeMap, mode: Mode) -> VerificationCheck {
    let expected = rule.expected(mode);
    let actual = attributes
        .get(rule.name)
        .cloned()
        .unwrap_or(RawValue::NotFound);

    // Unreadable attributes never pass, whatever the expectation
    let passed = actual.is_found() && expected.evaluate(&actual);
    debug!(efuse = rule.name, %expected, %actual, passed, "eFuse check");

    VerificationCheck {
        name: rule.name.to_string(),
        description: rule.description.to_string(),
        expected,
        actual,
        passed,
    }
}

/// Locked devices need at least one key block holding a secure boot digest.
fn secure_boot_digest_check(attributes: &AttributeMap) -> VerificationCheck {
    let purposes: Vec<(&str, &RawValue)> = KEY_PURPOSE_SLOTS
        .iter()
        .filter_map(|slot| {
            attributes
                .get(*slot)
                .filter(|v| v.is_found())
                .map(|v| (*slot, v))
        })
        .collect();

    let digest_slot = purposes.iter().find(|(_, v)| is_secure_boot_digest(v));

    let actual = match (digest_slot, purposes.is_empty()) {
        (Some((slot, value)), _) => RawValue::Text(format!("{}={}", slot, value)),
        (None, true) => RawValue::NotFound,
        (None, false) => RawValue::Text(
            purposes
                .iter()
                .map(|(slot, value)| format!("{}={}", slot, value))
                .collect::<Vec<_>>()
                .join(", "),
        ),
    };

    let passed = digest_slot.is_some();
    debug!(efuse = SECURE_BOOT_DIGEST_CHECK, %actual, passed, "eFuse check");

    VerificationCheck {
        name: SECURE_BOOT_DIGEST_CHECK.to_string(),
        description: format!("At least one key block holds a {} purpose", SECURE_BOOT_DIGEST_PURPOSE),
        expected: Expected::Predicate {
            tag: "any KEY_PURPOSE_n contains SECURE_BOOT_DIGEST",
            check: is_secure_boot_digest,
        },
        actual,
        passed,
    }
}
