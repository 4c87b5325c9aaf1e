use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::cargo_bin("canary-replay").unwrap()
}

fn lines(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn replays_events_from_stdin() {
    let input = [
        r#"{"topic": "securacv/canary-01/tamper", "payload": {"type": "gpio"}}"#,
        r#"{"topic": "securacv/canary-01/health", "payload": {"battery": 90}}"#,
        r#"{"device_id": "canary-01", "category": "tamper", "payload": {"type": "motion"}}"#,
        r#"{"topic": "securacv/canary-01/status", "payload": "online"}"#,
    ]
    .join("\n");

    let output = cmd().write_stdin(input).output().unwrap();
    assert!(output.status.success());

    let records = lines(&output.stdout);
    assert_eq!(records.len(), 4);
    assert_eq!(records[0]["first_sighting"], true);
    assert_eq!(records[0]["monitors"].as_array().unwrap().len(), 10);
    // Health is not discovered yet, so the aggregate signal is not written
    assert!(records[0]["classification"]["signals"]
        .as_array()
        .unwrap()
        .iter()
        .all(|s| s["kind"] != "tamper"));
    assert_eq!(records[2]["first_sighting"], false);
    assert_eq!(records[3]["classification"]["signals"][0]["value"], true);

    let gpio = records[1]["classification"]["signals"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["kind"] == "tamper_gpio")
        .unwrap()
        .clone();
    assert_eq!(gpio["value"], true);
}

#[test]
fn rejected_events_are_reported_inline() {
    let input = [
        "this is not json",
        r#"{"topic": "securacv/canary-01/weather", "payload": {}}"#,
        r#"{"payload": {}}"#,
        r#"{"topic": "securacv/canary-01/counts", "payload": "12"}"#,
    ]
    .join("\n");

    let output = cmd().write_stdin(input).output().unwrap();
    assert!(output.status.success());

    let records = lines(&output.stdout);
    assert_eq!(records[0]["line"], 1);
    assert!(records[1]["error"].as_str().unwrap().contains("weather"));
    assert!(records[2]["error"].is_string());
    assert_eq!(records[3]["classification"]["signals"][0]["value"], 12);
}

#[test]
fn prefix_and_summary_from_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("canary.toml");
    fs::write(&config, "[telemetry]\ntopic_prefix = \"lab\"\n").unwrap();
    let input = dir.path().join("events.ndjson");
    fs::write(
        &input,
        "{\"topic\": \"lab/canary-09/mesh\", \"payload\": {\"peers\": [\"a\"]}}\n",
    )
    .unwrap();

    cmd()
        .arg("--config")
        .arg(&config)
        .arg("--input")
        .arg(&input)
        .arg("--summary")
        .assert()
        .success()
        .stdout(contains("mesh_connected").and(contains("\"discovered_pairs\":1")));
}

#[test]
fn missing_input_file_fails() {
    cmd()
        .args(["--input", "/nonexistent/events.ndjson"])
        .assert()
        .failure()
        .stderr(contains("failed to open"));
}
