//! Provisioning flow: configuration → eFuse verification → report

use canary_core::Config;
use canary_efuse::report::{self, EXIT_FAIL, EXIT_PASS};
use canary_efuse::{attributes_from_json, verify, DeviceIdentity, Mode, RawValue, NOT_FOUND};

use crate::test_utils::{factory_attributes, hardened_summary, init_tracing};

#[test]
fn test_provisioned_device_passes_locked_profile() {
    init_tracing();

    let config = Config::from_toml_str("[verifier]\ndefault_mode = \"post_provision\"\n").unwrap();
    let mode: Mode = config.verifier.default_mode.parse().unwrap();
    assert_eq!(mode, Mode::Locked);

    let attributes = attributes_from_json(&hardened_summary()).unwrap();
    let identity = DeviceIdentity {
        chip_model: Some("ESP32-S3 (QFN56)".to_string()),
        mac_address: Some("7c:df:a1:00:00:01".to_string()),
        ..Default::default()
    };

    let result = verify(&attributes, mode, Some(identity));
    let failures: Vec<_> = result.failures().map(|c| c.name.as_str()).collect();
    assert!(result.overall_pass, "failures: {:?}", failures);
    assert_eq!(report::exit_code(&result), EXIT_PASS);

    let json: serde_json::Value =
        serde_json::from_str(&report::to_json_pretty(&result).unwrap()).unwrap();
    assert_eq!(json["identity"]["chip_model"], "ESP32-S3 (QFN56)");
    assert_eq!(json["checks"].as_array().unwrap().len(), result.checks.len());
}

#[test]
fn test_profiles_are_mutually_exclusive() {
    let factory = factory_attributes();
    let hardened = attributes_from_json(&hardened_summary()).unwrap();

    assert!(verify(&factory, Mode::Virgin, None).overall_pass);
    assert!(!verify(&factory, Mode::Locked, None).overall_pass);
    assert!(verify(&hardened, Mode::Locked, None).overall_pass);
    assert!(!verify(&hardened, Mode::Virgin, None).overall_pass);
}

#[test]
fn test_unreadable_fuse_fails_closed() {
    let mut attributes = attributes_from_json(&hardened_summary()).unwrap();
    attributes.remove("SECURE_BOOT_EN");
    attributes.insert("SOFT_DIS_JTAG".to_string(), RawValue::coerce_str("0xGG"));

    let result = verify(&attributes, Mode::Locked, None);
    assert!(!result.overall_pass);
    assert_eq!(report::exit_code(&result), EXIT_FAIL);

    let failed: Vec<_> = result.failures().map(|c| c.name.as_str()).collect();
    assert_eq!(failed, vec!["SECURE_BOOT_EN", "SOFT_DIS_JTAG"]);
    for check in result.failures() {
        assert_eq!(check.actual.to_string(), NOT_FOUND);
    }

    let text = report::render_text(&result);
    assert!(text.contains("SECURE_BOOT_EN"));
    assert!(text.contains("2 of"));
}

#[test]
fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("canary.toml");
    std::fs::write(
        &path,
        "[logging]\nlevel = \"debug\"\n\n[verifier]\ndefault_mode = \"locked\"\n",
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.telemetry.topic_prefix, "securacv");
    assert_eq!(config.verifier.default_mode.parse::<Mode>().unwrap(), Mode::Locked);
}
