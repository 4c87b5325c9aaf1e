//! Telemetry lifecycle: discovery, classification and latching end to end

use canary_core::Config;
use canary_telemetry::{Category, Dispatcher, SignalKind, SignalValue, TamperKind, TransportKind};
use serde_json::json;

use crate::test_utils::{bytes, healthy_report, init_tracing, signal};

#[test]
fn test_device_lifecycle() {
    init_tracing();
    let dispatcher = Dispatcher::from_config(&Config::default_config().telemetry);

    let status = dispatcher
        .handle_topic_at("securacv/canary-01/status", b"online", 1_000)
        .unwrap();
    assert!(status.first_sighting);
    assert_eq!(status.monitors, vec![SignalKind::Online]);

    let health = dispatcher
        .handle_topic_at("securacv/canary-01/health", &bytes(&healthy_report()), 2_000)
        .unwrap();
    assert!(health.first_sighting);
    assert!(!signal(&health, SignalKind::AnyTamper).unwrap().is_on());
    assert_eq!(
        signal(&health, SignalKind::HealthStatus).unwrap().value,
        SignalValue::Text("healthy".to_string())
    );
    assert_eq!(
        signal(&health, SignalKind::GpsFix).unwrap().value,
        SignalValue::Text("3d".to_string())
    );

    let tamper = dispatcher
        .handle_topic_at(
            "securacv/canary-01/tamper",
            &bytes(&json!({"type": "enclosure", "detail": "lid switch", "severity": "alert"})),
            3_000,
        )
        .unwrap();
    assert!(tamper.first_sighting);
    let enclosure = signal(&tamper, SignalKind::Tamper(TamperKind::Enclosure)).unwrap();
    assert!(enclosure.is_on());
    assert_eq!(enclosure.attributes["severity"], "alert");

    // A clean health report afterwards clears nothing
    let health = dispatcher
        .handle_topic_at("securacv/canary-01/health", &bytes(&healthy_report()), 4_000)
        .unwrap();
    assert!(!health.first_sighting);
    assert!(signal(&health, SignalKind::AnyTamper).unwrap().is_on());
    let enclosure = signal(&health, SignalKind::Tamper(TamperKind::Enclosure)).unwrap();
    assert!(enclosure.is_on());
    assert_eq!(enclosure.last_triggered, Some(3_000));

    let offline = dispatcher
        .handle_topic_at("securacv/canary-01/status", b"offline", 5_000)
        .unwrap();
    assert!(!offline.first_sighting);
    assert!(!signal(&offline, SignalKind::Online).unwrap().is_on());

    let diagnostics = dispatcher.diagnostics();
    assert_eq!(diagnostics.devices, 1);
    assert_eq!(diagnostics.discovered_pairs, 3);
}

#[test]
fn test_every_signal_follows_its_discovery() {
    let dispatcher = Dispatcher::default();
    let messages = [
        (Category::Transport, json!({"mqtt": {"connected": true, "rssi": -70}, "ble": false})),
        (Category::Mesh, json!({"peers": ["canary-02", "canary-03"], "sent": 4})),
        (Category::Chirp, json!({"enabled": true, "ready": false})),
        (Category::Chain, json!({"valid": true, "length": 120})),
        (Category::Counts, json!({"total": 57})),
        (Category::Events, json!({"event_type": "person", "zone": "gate"})),
        (Category::Health, json!({"free_heap": 8000, "battery": 7})),
        (Category::Tamper, json!({"type": "watchdog"})),
        (Category::Health, json!({"free_heap": 8000, "battery": 7})),
    ];

    let mut monitors = Vec::new();
    for (category, payload) in &messages {
        let dispatch = dispatcher.handle_at("canary-05", *category, &bytes(payload), 1).unwrap();
        assert!(dispatch.classification.applied);
        monitors.extend(dispatch.monitors.iter().copied());

        // Nothing is returned or stored ahead of its monitor
        for returned in &dispatch.classification.signals {
            assert!(monitors.contains(&returned.kind), "{} returned before its monitor", returned.kind);
        }
        for stored in dispatcher.snapshot("canary-05") {
            assert!(monitors.contains(&stored.kind), "{} stored before its monitor", stored.kind);
            assert!(
                dispatcher.registry().is_known("canary-05", stored.kind.owner()),
                "{} stored before its pair was discovered",
                stored.kind
            );
        }
    }
    assert_eq!(dispatcher.registry().categories("canary-05").len(), 8);

    let store = dispatcher.classifier().store();
    let mqtt = store.get("canary-05", SignalKind::Transport(TransportKind::Mqtt)).unwrap();
    assert!(mqtt.is_on());
    assert_eq!(mqtt.attributes["rssi"], -70);

    let health = store.get("canary-05", SignalKind::HealthStatus).unwrap();
    assert_eq!(health.value, SignalValue::Text("critical".to_string()));
    assert!(store.get("canary-05", SignalKind::AnyTamper).unwrap().is_on());
    assert!(store
        .get("canary-05", SignalKind::Tamper(TamperKind::MemoryCritical))
        .unwrap()
        .is_on());
}

#[test]
fn test_malformed_messages_leave_state_alone() {
    let dispatcher = Dispatcher::default();
    dispatcher
        .handle_at("canary-01", Category::Chain, &bytes(&json!({"valid": false})), 1)
        .unwrap();
    let before = dispatcher.snapshot("canary-01");

    for raw in [&b""[..], b"{", b"null", b"[true]"] {
        let dispatch = dispatcher.handle_at("canary-01", Category::Chain, raw, 2).unwrap();
        assert!(!dispatch.classification.applied);
    }
    assert_eq!(dispatcher.snapshot("canary-01"), before);
}
