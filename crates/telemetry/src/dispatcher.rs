//! Dispatcher: single entry point from a message to discovery and
//! classification.

use canary_core::{current_timestamp_ms, TelemetryConfig};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::category::Category;
use crate::classifier::{Classification, TelemetryClassifier};
use crate::discovery::DiscoveryRegistry;
use crate::error::{TelemetryError, TelemetryResult};
use crate::rules::RuleSet;
use crate::signal::{Signal, SignalKind};
use crate::store::SignalStore;

/// Default topic prefix devices publish under.
pub const DEFAULT_TOPIC_PREFIX: &str = "securacv";

/// Result of handling one message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dispatch {
    pub device_id: String,
    pub category: Category,
    /// True exactly once per (device, category) pair
    pub first_sighting: bool,
    /// Signals the host should materialize; empty unless first sighting
    pub monitors: Vec<SignalKind>,
    pub classification: Classification,
}

/// Summary of engine state for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub devices: usize,
    pub discovered_pairs: usize,
    pub signals: usize,
}

/// Routes messages through the registry and classifier.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<DiscoveryRegistry>,
    classifier: Arc<TelemetryClassifier>,
    topic_prefix: String,
}

impl Dispatcher {
    pub fn new(registry: Arc<DiscoveryRegistry>, classifier: Arc<TelemetryClassifier>) -> Self {
        Self {
            registry,
            classifier,
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
        }
    }

    /// Build a dispatcher with fresh state from configuration
    pub fn from_config(config: &TelemetryConfig) -> Self {
        let classifier = TelemetryClassifier::with_store(
            RuleSet::with_thresholds(&config.thresholds),
            Arc::new(SignalStore::new()),
        );
        Self::new(Arc::new(DiscoveryRegistry::new()), Arc::new(classifier))
            .with_topic_prefix(&config.topic_prefix)
    }

    pub fn with_topic_prefix(mut self, prefix: &str) -> Self {
        self.topic_prefix = prefix.trim_matches('/').to_string();
        self
    }

    pub fn registry(&self) -> &Arc<DiscoveryRegistry> {
        &self.registry
    }

    pub fn classifier(&self) -> &Arc<TelemetryClassifier> {
        &self.classifier
    }

    pub fn topic_prefix(&self) -> &str {
        &self.topic_prefix
    }

    /// Handle one message for a device and category.
    pub fn handle(
        &self,
        device_id: &str,
        category: Category,
        payload: &[u8],
    ) -> TelemetryResult<Dispatch> {
        self.handle_at(device_id, category, payload, current_timestamp_ms())
    }

    /// Handle one message with an explicit timestamp.
    pub fn handle_at(
        &self,
        device_id: &str,
        category: Category,
        payload: &[u8],
        now_ms: u64,
    ) -> TelemetryResult<Dispatch> {
        if device_id.is_empty() {
            return Err(TelemetryError::EmptyDeviceId);
        }

        // Register before classifying so no signal exists ahead of its pair
        let first_sighting = self.registry.register_if_new(device_id, category);
        let monitors = if first_sighting {
            SignalKind::owned_by(category)
        } else {
            Vec::new()
        };

        // Signals of pairs the host has not been told about yet stay unwritten
        let known = self.registry.categories(device_id);
        let classification = self.classifier.classify_scoped_at(
            device_id,
            category,
            payload,
            now_ms,
            |kind| known.contains(&kind.owner()),
        );
        debug!(
            device_id,
            %category,
            first_sighting,
            applied = classification.applied,
            "dispatched telemetry"
        );

        Ok(Dispatch {
            device_id: device_id.to_string(),
            category,
            first_sighting,
            monitors,
            classification,
        })
    }

    /// Handle a message whose category is given as a topic suffix.
    pub fn handle_named(
        &self,
        device_id: &str,
        category: &str,
        payload: &[u8],
    ) -> TelemetryResult<Dispatch> {
        self.handle(device_id, category.parse()?, payload)
    }

    /// Handle a message published on `<prefix>/<device_id>/<category>`.
    pub fn handle_topic(&self, topic: &str, payload: &[u8]) -> TelemetryResult<Dispatch> {
        self.handle_topic_at(topic, payload, current_timestamp_ms())
    }

    pub fn handle_topic_at(
        &self,
        topic: &str,
        payload: &[u8],
        now_ms: u64,
    ) -> TelemetryResult<Dispatch> {
        let (device_id, category) = self.split_topic(topic)?;
        self.handle_at(device_id, category, payload, now_ms)
    }

    /// Split a topic into device id and category.
    pub fn split_topic<'a>(&self, topic: &'a str) -> TelemetryResult<(&'a str, Category)> {
        let invalid = |reason: &str| TelemetryError::InvalidTopic {
            topic: topic.to_string(),
            reason: reason.to_string(),
        };

        let rest = topic
            .strip_prefix(self.topic_prefix.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| invalid(&format!("expected prefix '{}'", self.topic_prefix)))?;

        let mut parts = rest.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(device_id), Some(category), None) => {
                if device_id.is_empty() {
                    return Err(TelemetryError::EmptyDeviceId);
                }
                Ok((device_id, category.parse()?))
            }
            _ => Err(invalid("expected <prefix>/<device_id>/<category>")),
        }
    }

    /// Every signal currently stored for a device.
    pub fn snapshot(&self, device_id: &str) -> Vec<Signal> {
        self.classifier.store().snapshot(device_id)
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            devices: self.registry.device_count(),
            discovered_pairs: self.registry.len(),
            signals: self.classifier.store().signal_count(),
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(
            Arc::new(DiscoveryRegistry::new()),
            Arc::new(TelemetryClassifier::new()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::TamperKind;

    #[test]
    fn test_first_sighting_reported_once() {
        let dispatcher = Dispatcher::default();

        let first = dispatcher.handle_at("canary-01", Category::Tamper, br#"{"type":"gpio"}"#, 1).unwrap();
        assert!(first.first_sighting);
        assert_eq!(first.monitors.len(), TamperKind::ALL.len());
        assert!(first.classification.applied);

        let second = dispatcher.handle_at("canary-01", Category::Tamper, br#"{"type":"sd_remove"}"#, 2).unwrap();
        assert!(!second.first_sighting);
        assert!(second.monitors.is_empty());
    }

    #[test]
    fn test_first_message_is_classified_even_if_undecodable() {
        let dispatcher = Dispatcher::default();
        let result = dispatcher.handle_at("canary-01", Category::Mesh, b"garbage", 1).unwrap();

        assert!(result.first_sighting);
        assert_eq!(result.monitors, vec![SignalKind::MeshConnected]);
        assert!(!result.classification.applied);
        assert!(dispatcher.registry().is_known("canary-01", Category::Mesh));
    }

    #[test]
    fn test_signals_wait_for_their_owning_pair() {
        let dispatcher = Dispatcher::default();
        let memory = SignalKind::Tamper(TamperKind::MemoryCritical);

        let health = dispatcher.handle_at("canary-01", Category::Health, br#"{"free_heap": 9000}"#, 1).unwrap();
        assert!(!dispatcher.registry().is_known("canary-01", Category::Tamper));
        for signal in &health.classification.signals {
            assert!(health.monitors.contains(&signal.kind), "{} has no monitor", signal.kind);
        }
        assert!(dispatcher.classifier().store().get("canary-01", memory).is_none());

        let tamper = dispatcher.handle_at("canary-01", Category::Tamper, br#"{"type":"gpio"}"#, 2).unwrap();
        assert!(tamper.first_sighting);
        assert!(tamper
            .classification
            .signals
            .iter()
            .any(|s| s.kind == SignalKind::AnyTamper && s.is_on()));

        dispatcher.handle_at("canary-01", Category::Health, br#"{"free_heap": 9000}"#, 3).unwrap();
        let signal = dispatcher.classifier().store().get("canary-01", memory).unwrap();
        assert!(signal.is_on());
        assert_eq!(signal.last_triggered, Some(3));
    }

    #[test]
    fn test_tamper_before_health_leaves_any_tamper_unwritten() {
        let dispatcher = Dispatcher::default();
        let tamper = dispatcher.handle_at("canary-01", Category::Tamper, br#"{"type":"gpio"}"#, 1).unwrap();

        assert!(tamper.classification.signals.iter().all(|s| tamper.monitors.contains(&s.kind)));
        assert!(dispatcher.classifier().store().get("canary-01", SignalKind::AnyTamper).is_none());
    }

    #[test]
    fn test_empty_device_rejected() {
        let dispatcher = Dispatcher::default();
        assert_eq!(
            dispatcher.handle("", Category::Status, b"online"),
            Err(TelemetryError::EmptyDeviceId)
        );
        assert!(dispatcher.registry().is_empty());
    }

    #[test]
    fn test_unknown_category_name_rejected() {
        let dispatcher = Dispatcher::default();
        assert_eq!(
            dispatcher.handle_named("canary-01", "presence", b"{}"),
            Err(TelemetryError::UnknownCategory("presence".to_string()))
        );
    }

    #[test]
    fn test_topic_routing() {
        let dispatcher = Dispatcher::default();
        let result = dispatcher.handle_topic("securacv/canary-07/status", b"online").unwrap();
        assert_eq!(result.device_id, "canary-07");
        assert_eq!(result.category, Category::Status);
        assert!(result.classification.signals[0].is_on());

        let nested = Dispatcher::default().with_topic_prefix("site/a/");
        assert_eq!(
            nested.split_topic("site/a/canary-01/health").unwrap(),
            ("canary-01", Category::Health)
        );
    }

    #[test]
    fn test_invalid_topics() {
        let dispatcher = Dispatcher::default();
        assert!(matches!(
            dispatcher.split_topic("other/canary-01/status"),
            Err(TelemetryError::InvalidTopic { .. })
        ));
        assert!(matches!(
            dispatcher.split_topic("securacv/canary-01"),
            Err(TelemetryError::InvalidTopic { .. })
        ));
        assert!(matches!(
            dispatcher.split_topic("securacv/canary-01/status/extra"),
            Err(TelemetryError::InvalidTopic { .. })
        ));
        assert_eq!(
            dispatcher.split_topic("securacv//status"),
            Err(TelemetryError::EmptyDeviceId)
        );
        assert_eq!(
            dispatcher.split_topic("securacv/canary-01/weather"),
            Err(TelemetryError::UnknownCategory("weather".to_string()))
        );
    }

    #[test]
    fn test_snapshot_and_diagnostics() {
        let dispatcher = Dispatcher::default();
        dispatcher.handle_at("canary-01", Category::Status, b"online", 1).unwrap();
        dispatcher.handle_at("canary-01", Category::Counts, b"5", 2).unwrap();
        dispatcher.handle_at("canary-02", Category::Status, b"offline", 3).unwrap();

        assert_eq!(dispatcher.snapshot("canary-01").len(), 2);
        assert_eq!(
            dispatcher.diagnostics(),
            Diagnostics {
                devices: 2,
                discovered_pairs: 3,
                signals: 3,
            }
        );
    }

    #[test]
    fn test_from_config_uses_prefix_and_thresholds() {
        let mut config = TelemetryConfig::default();
        config.topic_prefix = "lab".to_string();
        config.thresholds.memory_critical_bytes = 50_000.0;

        let dispatcher = Dispatcher::from_config(&config);
        assert!(dispatcher.registry().register_if_new("canary-01", Category::Tamper));
        let result = dispatcher
            .handle_topic_at("lab/canary-01/health", br#"{"free_heap": 40000}"#, 1)
            .unwrap();

        let memory = result
            .classification
            .signals
            .iter()
            .find(|s| s.kind == SignalKind::Tamper(TamperKind::MemoryCritical))
            .unwrap();
        assert!(memory.is_on());
    }
}
