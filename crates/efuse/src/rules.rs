//! Security rule table for ESP32-S3 eFuse verification.
//!
//! Each rule names one eFuse and states what it must read in each
//! verification mode. Expectations are either a literal value or a named
//! predicate over the raw value.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::EfuseError;
use crate::value::RawValue;

/// The two mutually exclusive security profiles a device can be checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Factory default: nothing burned, no key slot assigned
    Virgin,
    /// Post-provisioning: every lockdown feature burned
    Locked,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Virgin => "virgin",
            Mode::Locked => "locked",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = EfuseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "virgin" => Ok(Mode::Virgin),
            "locked" | "post_provision" | "post-provision" => Ok(Mode::Locked),
            other => Err(EfuseError::UnknownMode(other.to_string())),
        }
    }
}

/// A literal expected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Literal {
    Int(i64),
    Text(&'static str),
}

impl Literal {
    pub fn matches(&self, actual: &RawValue) -> bool {
        match (self, actual) {
            (Literal::Int(expected), RawValue::Int(v)) => expected == v,
            (Literal::Text(expected), RawValue::Text(v)) => *expected == v.as_str(),
            _ => false,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Text(s) => f.write_str(s),
        }
    }
}

/// What a rule expects in a given mode.
#[derive(Debug, Clone, Copy)]
pub enum Expected {
    Literal(Literal),
    Predicate {
        /// Short description shown in reports in place of a value
        tag: &'static str,
        check: fn(&RawValue) -> bool,
    },
}

impl Expected {
    pub fn evaluate(&self, actual: &RawValue) -> bool {
        match self {
            Expected::Literal(literal) => literal.matches(actual),
            Expected::Predicate { check, .. } => check(actual),
        }
    }

    pub fn literal(&self) -> Option<Literal> {
        match self {
            Expected::Literal(literal) => Some(*literal),
            Expected::Predicate { .. } => None,
        }
    }
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Literal(literal) => write!(f, "{}", literal),
            Expected::Predicate { tag, .. } => write!(f, "<{}>", tag),
        }
    }
}

impl Serialize for Expected {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Expected::Literal(Literal::Int(v)) => serializer.serialize_i64(*v),
            Expected::Literal(Literal::Text(s)) => serializer.serialize_str(s),
            Expected::Predicate { .. } => serializer.collect_str(self),
        }
    }
}

/// One named eFuse check with per-mode expectations.
#[derive(Debug, Clone, Copy)]
pub struct SecurityRule {
    pub name: &'static str,
    pub description: &'static str,
    pub virgin: Expected,
    pub locked: Expected,
    /// Boundary lockdown bit: virgin and locked literals must differ
    pub lockdown: bool,
}

impl SecurityRule {
    pub fn expected(&self, mode: Mode) -> Expected {
        match mode {
            Mode::Virgin => self.virgin,
            Mode::Locked => self.locked,
        }
    }
}

/// Name of the aggregate check that requires a secure boot digest key in locked mode.
pub const SECURE_BOOT_DIGEST_CHECK: &str = "SECURE_BOOT_DIGEST_ASSIGNED";

/// Key purpose marker for secure boot digests (`SECURE_BOOT_DIGEST0..2`).
pub const SECURE_BOOT_DIGEST_PURPOSE: &str = "SECURE_BOOT_DIGEST";

/// eFuse names of the six key purpose slots.
pub const KEY_PURPOSE_SLOTS: [&str; 6] = [
    "KEY_PURPOSE_0",
    "KEY_PURPOSE_1",
    "KEY_PURPOSE_2",
    "KEY_PURPOSE_3",
    "KEY_PURPOSE_4",
    "KEY_PURPOSE_5",
];

const FLASH_ENCRYPTION_PURPOSES: [&str; 3] =
    ["XTS_AES_128_KEY", "XTS_AES_256_KEY_1", "XTS_AES_256_KEY_2"];

const UNASSIGNED_PURPOSES: [&str; 4] = ["", "USER", "USER/EMPTY", "0"];

const fn int(v: i64) -> Expected {
    Expected::Literal(Literal::Int(v))
}

/// Flash encryption is on when the counter has an odd number of bits set.
fn odd_bit_count(v: &RawValue) -> bool {
    matches!(v.as_int(), Some(n) if n >= 0 && n.count_ones() % 2 == 1)
}

fn readable(v: &RawValue) -> bool {
    v.is_found()
}

fn non_negative(v: &RawValue) -> bool {
    matches!(v.as_int(), Some(n) if n >= 0)
}

fn unassigned_key(v: &RawValue) -> bool {
    match v {
        RawValue::Int(n) => *n == 0,
        RawValue::Text(s) => UNASSIGNED_PURPOSES.contains(&s.trim().to_ascii_uppercase().as_str()),
        RawValue::NotFound => false,
    }
}

fn flash_encryption_key(v: &RawValue) -> bool {
    v.as_text()
        .map(|s| FLASH_ENCRYPTION_PURPOSES.iter().any(|p| s.contains(p)))
        .unwrap_or(false)
}

/// Does this key purpose value designate a secure boot digest?
pub fn is_secure_boot_digest(v: &RawValue) -> bool {
    v.as_text()
        .map(|s| s.contains(SECURE_BOOT_DIGEST_PURPOSE))
        .unwrap_or(false)
}

const UNASSIGNED: Expected = Expected::Predicate {
    tag: "unassigned",
    check: unassigned_key,
};

const READABLE: Expected = Expected::Predicate {
    tag: "any readable value",
    check: readable,
};

/// Security-relevant eFuses for ESP32-S3.
pub static RULE_TABLE: [SecurityRule; 18] = [
    // Secure Boot
    SecurityRule {
        name: "SECURE_BOOT_EN",
        description: "Enables Secure Boot v2",
        virgin: int(0),
        locked: int(1),
        lockdown: true,
    },
    SecurityRule {
        name: "SECURE_BOOT_AGGRESSIVE_REVOKE",
        description: "Aggressive key revocation mode",
        virgin: int(0),
        locked: int(1),
        lockdown: true,
    },
    // Flash Encryption
    SecurityRule {
        name: "SPI_BOOT_CRYPT_CNT",
        description: "Flash encryption enable counter",
        virgin: int(0),
        locked: Expected::Predicate {
            tag: "odd bit count",
            check: odd_bit_count,
        },
        lockdown: true,
    },
    SecurityRule {
        name: "DIS_DOWNLOAD_MANUAL_ENCRYPT",
        description: "Disable manual flash encryption in download mode",
        virgin: int(0),
        locked: int(1),
        lockdown: true,
    },
    // Download mode
    SecurityRule {
        name: "ENABLE_SECURITY_DOWNLOAD",
        description: "Restrict ROM download mode to secure commands",
        virgin: int(0),
        locked: int(1),
        lockdown: true,
    },
    SecurityRule {
        name: "DIS_DOWNLOAD_MODE",
        description: "Disable ROM download mode",
        virgin: int(0),
        locked: int(1),
        lockdown: true,
    },
    // JTAG
    SecurityRule {
        name: "JTAG_SEL_ENABLE",
        description: "JTAG source selection strapping (stays 0)",
        virgin: int(0),
        locked: int(0),
        lockdown: false,
    },
    SecurityRule {
        name: "SOFT_DIS_JTAG",
        description: "Software JTAG disable (all three bits)",
        virgin: int(0),
        locked: int(7),
        lockdown: true,
    },
    SecurityRule {
        name: "DIS_PAD_JTAG",
        description: "Disable pad JTAG",
        virgin: int(0),
        locked: int(1),
        lockdown: true,
    },
    SecurityRule {
        name: "DIS_USB_JTAG",
        description: "Disable USB JTAG",
        virgin: int(0),
        locked: int(1),
        lockdown: true,
    },
    SecurityRule {
        name: "DIS_USB_SERIAL_JTAG",
        description: "Disable USB serial/JTAG controller",
        virgin: int(0),
        locked: READABLE,
        lockdown: false,
    },
    // Anti-rollback
    SecurityRule {
        name: "SECURE_VERSION",
        description: "Secure version for anti-rollback",
        virgin: int(0),
        locked: Expected::Predicate {
            tag: "non-negative version",
            check: non_negative,
        },
        lockdown: false,
    },
    // Key blocks
    SecurityRule {
        name: "KEY_PURPOSE_0",
        description: "Key block 0 purpose (flash encryption key)",
        virgin: UNASSIGNED,
        locked: Expected::Predicate {
            tag: "XTS_AES flash encryption key",
            check: flash_encryption_key,
        },
        lockdown: true,
    },
    SecurityRule {
        name: "KEY_PURPOSE_1",
        description: "Key block 1 purpose",
        virgin: UNASSIGNED,
        locked: READABLE,
        lockdown: false,
    },
    SecurityRule {
        name: "KEY_PURPOSE_2",
        description: "Key block 2 purpose",
        virgin: UNASSIGNED,
        locked: READABLE,
        lockdown: false,
    },
    SecurityRule {
        name: "KEY_PURPOSE_3",
        description: "Key block 3 purpose",
        virgin: UNASSIGNED,
        locked: READABLE,
        lockdown: false,
    },
    SecurityRule {
        name: "KEY_PURPOSE_4",
        description: "Key block 4 purpose",
        virgin: UNASSIGNED,
        locked: READABLE,
        lockdown: false,
    },
    SecurityRule {
        name: "KEY_PURPOSE_5",
        description: "Key block 5 purpose",
        virgin: UNASSIGNED,
        locked: READABLE,
        lockdown: false,
    },
];

/// The rule table every verification runs against.
pub fn rule_table() -> &'static [SecurityRule] {
    &RULE_TABLE
}
