//! Test utilities for cross-crate integration tests

use canary_efuse::{AttributeMap, RawValue};
use canary_telemetry::{Dispatch, Signal, SignalKind};
use serde_json::{json, Value};

/// Install a test subscriber once; later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Attribute map of a device straight from the factory
pub fn factory_attributes() -> AttributeMap {
    let mut map = AttributeMap::new();
    for rule in canary_efuse::rule_table() {
        map.insert(rule.name.to_string(), RawValue::Int(0));
    }
    for slot in 0..6 {
        map.insert(format!("KEY_PURPOSE_{}", slot), RawValue::Text("USER".to_string()));
    }
    map
}

/// espefuse-style JSON summary of a fully provisioned device
pub fn hardened_summary() -> Value {
    json!({
        "SECURE_BOOT_EN": {"value": true},
        "SECURE_BOOT_AGGRESSIVE_REVOKE": {"value": true},
        "SPI_BOOT_CRYPT_CNT": {"value": "0b001"},
        "DIS_DOWNLOAD_MANUAL_ENCRYPT": {"value": true},
        "ENABLE_SECURITY_DOWNLOAD": {"value": true},
        "DIS_DOWNLOAD_MODE": {"value": true},
        "JTAG_SEL_ENABLE": {"value": false},
        "SOFT_DIS_JTAG": {"value": 7},
        "DIS_PAD_JTAG": {"value": true},
        "DIS_USB_JTAG": {"value": true},
        "DIS_USB_SERIAL_JTAG": {"value": true},
        "SECURE_VERSION": {"value": 0},
        "KEY_PURPOSE_0": {"value": "XTS_AES_256_KEY_1"},
        "KEY_PURPOSE_1": {"value": "XTS_AES_256_KEY_2"},
        "KEY_PURPOSE_2": {"value": "SECURE_BOOT_DIGEST0"},
        "KEY_PURPOSE_3": {"value": "USER"},
        "KEY_PURPOSE_4": {"value": "USER"},
        "KEY_PURPOSE_5": {"value": "USER"}
    })
}

/// Health report of a device in good shape
pub fn healthy_report() -> Value {
    json!({
        "battery": 88,
        "memory_free": 64000,
        "free_heap": 72000,
        "sd_mounted": true,
        "sd_errors": 0,
        "uptime": 3600,
        "firmware_version": "0.9.1",
        "tamper": {"motion": false, "gpio": false, "enclosure": false},
        "gps": {"fix_type": "3d", "satellites": 11}
    })
}

pub fn bytes(value: &Value) -> Vec<u8> {
    value.to_string().into_bytes()
}

/// Find a signal in a dispatch result.
pub fn signal(dispatch: &Dispatch, kind: SignalKind) -> Option<&Signal> {
    dispatch
        .classification
        .signals
        .iter()
        .find(|s| s.kind == kind)
}
