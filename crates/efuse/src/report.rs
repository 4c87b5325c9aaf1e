//! Rendering of verification reports for humans and machines.

use serde::Serialize;
use std::fmt;

use crate::error::EfuseResult;
use crate::verifier::{DeviceIdentity, SecuritySummary, VerificationReport};

/// Every check passed.
pub const EXIT_PASS: i32 = 0;
/// At least one check failed.
pub const EXIT_FAIL: i32 = 1;
/// Device data could not be obtained.
pub const EXIT_UNAVAILABLE: i32 = 2;

const RULE_WIDTH: usize = 72;

/// Process exit code for a finished report.
pub fn exit_code(report: &VerificationReport) -> i32 {
    if report.overall_pass {
        EXIT_PASS
    } else {
        EXIT_FAIL
    }
}

/// Pretty-printed JSON document for a report or summary.
pub fn to_json_pretty<T: Serialize>(value: &T) -> EfuseResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Human-readable report enumerating every check and listing all failures.
pub fn render_text(report: &VerificationReport) -> String {
    TextReport(report).to_string()
}

/// Human-readable listing of the security attributes of a summary.
pub fn render_summary(summary: &SecuritySummary) -> String {
    TextSummary(summary).to_string()
}

/// Text form of a [`VerificationReport`].
pub struct TextReport<'a>(pub &'a VerificationReport);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let title = format!("eFuse verification ({} mode)", report.mode);
        write_header(f, &title, &report.tool_version, &report.generated_at.to_rfc3339())?;
        if let Some(identity) = &report.identity {
            write_identity(f, identity)?;
        }

        let width = report.checks.iter().map(|c| c.name.len()).max().unwrap_or(0);
        for check in &report.checks {
            writeln!(
                f,
                "  [{}] {:<width$}  expected {:<24} actual {}",
                if check.passed { "PASS" } else { "FAIL" },
                check.name,
                check.expected.to_string(),
                check.actual,
                width = width,
            )?;
        }

        writeln!(f)?;
        let failed: Vec<_> = report.failures().collect();
        if failed.is_empty() {
            return writeln!(f, "  RESULT: PASS ({} checks)", report.checks.len());
        }

        writeln!(
            f,
            "  RESULT: FAIL ({} of {} checks failed)",
            failed.len(),
            report.checks.len()
        )?;
        for check in failed {
            writeln!(
                f,
                "    - {}: {} (expected {}, got {})",
                check.name, check.description, check.expected, check.actual
            )?;
        }
        Ok(())
    }
}

/// Text form of a [`SecuritySummary`].
pub struct TextSummary<'a>(pub &'a SecuritySummary);

impl fmt::Display for TextSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.0;
        write_header(
            f,
            "Security eFuse summary",
            &summary.tool_version,
            &summary.generated_at.to_rfc3339(),
        )?;
        if let Some(identity) = &summary.identity {
            write_identity(f, identity)?;
        }

        for entry in &summary.security {
            writeln!(f, "  {:<30} = {}", entry.name, entry.value)?;
        }
        writeln!(f)?;
        writeln!(f, "  RESULT: INFO (no verification mode selected)")
    }
}

fn write_header(f: &mut fmt::Formatter<'_>, title: &str, version: &str, at: &str) -> fmt::Result {
    let rule = "=".repeat(RULE_WIDTH);
    writeln!(f, "{}", rule)?;
    writeln!(f, "  {}", title)?;
    writeln!(f, "  efuse-verify v{}  {}", version, at)?;
    writeln!(f, "{}", rule)
}

fn write_identity(f: &mut fmt::Formatter<'_>, identity: &DeviceIdentity) -> fmt::Result {
    let fields = [
        ("Chip model", &identity.chip_model),
        ("Revision", &identity.chip_revision),
        ("MAC", &identity.mac_address),
        ("Chip ID", &identity.chip_id),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            writeln!(f, "  {:<12} {}", label, value)?;
        }
    }
    writeln!(f)
}
