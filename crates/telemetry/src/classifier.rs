//! Telemetry classifier: decodes a payload for a (device, category) pair,
//! applies the category's rules and updates the signal store.

use canary_core::{current_timestamp_ms, HealthThresholds};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::category::Category;
use crate::payload::{decode, Payload};
use crate::rules::RuleSet;
use crate::signal::{Signal, SignalKind};
use crate::store::SignalStore;

/// Outcome of classifying one message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    /// False when the payload could not be decoded and nothing changed
    pub applied: bool,
    /// Current state of the signals the category writes
    pub signals: Vec<Signal>,
}

/// Maps decoded payloads onto stored signals.
#[derive(Debug)]
pub struct TelemetryClassifier {
    rules: RuleSet,
    store: Arc<SignalStore>,
}

impl TelemetryClassifier {
    /// Create a classifier over a fresh store with default thresholds
    pub fn new() -> Self {
        Self::with_store(RuleSet::new(), Arc::new(SignalStore::new()))
    }

    /// Create a classifier with custom thresholds over a fresh store
    pub fn with_thresholds(thresholds: &HealthThresholds) -> Self {
        Self::with_store(
            RuleSet::with_thresholds(thresholds),
            Arc::new(SignalStore::new()),
        )
    }

    /// Create a classifier over an injected rule set and store
    pub fn with_store(rules: RuleSet, store: Arc<SignalStore>) -> Self {
        Self { rules, store }
    }

    pub fn store(&self) -> &Arc<SignalStore> {
        &self.store
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Classify raw payload bytes.
    pub fn classify(&self, device_id: &str, category: Category, raw: &[u8]) -> Classification {
        self.classify_at(device_id, category, raw, current_timestamp_ms())
    }

    /// Classify raw payload bytes with an explicit timestamp.
    pub fn classify_at(
        &self,
        device_id: &str,
        category: Category,
        raw: &[u8],
        now_ms: u64,
    ) -> Classification {
        self.classify_scoped_at(device_id, category, raw, now_ms, |_| true)
    }

    /// Classify raw payload bytes, writing and returning only the signals
    /// for which `in_scope` holds.
    pub fn classify_scoped_at<F>(
        &self,
        device_id: &str,
        category: Category,
        raw: &[u8],
        now_ms: u64,
        in_scope: F,
    ) -> Classification
    where
        F: Fn(SignalKind) -> bool,
    {
        match decode(category, raw) {
            Ok(payload) => self.apply(device_id, category, payload, now_ms, &in_scope),
            Err(err) => {
                debug!(device_id, %category, error = %err, "ignoring undecodable payload");
                Classification {
                    applied: false,
                    signals: self
                        .store
                        .select(device_id, &self.scoped_kinds(category, &in_scope)),
                }
            }
        }
    }

    /// Classify an already decoded payload.
    pub fn classify_payload(
        &self,
        device_id: &str,
        category: Category,
        payload: Payload,
    ) -> Classification {
        self.classify_payload_at(device_id, category, payload, current_timestamp_ms())
    }

    /// Classify an already decoded payload with an explicit timestamp.
    pub fn classify_payload_at(
        &self,
        device_id: &str,
        category: Category,
        payload: Payload,
        now_ms: u64,
    ) -> Classification {
        self.apply(device_id, category, payload, now_ms, &|_| true)
    }

    fn scoped_kinds(
        &self,
        category: Category,
        in_scope: &dyn Fn(SignalKind) -> bool,
    ) -> Vec<SignalKind> {
        let mut kinds = self.rules.affected(category);
        kinds.retain(|kind| in_scope(*kind));
        kinds
    }

    fn apply(
        &self,
        device_id: &str,
        category: Category,
        payload: Payload,
        now_ms: u64,
        in_scope: &dyn Fn(SignalKind) -> bool,
    ) -> Classification {
        let object = payload.into_object();
        let mut updates = self.rules.evaluate(category, &object);
        updates.retain(|update| in_scope(update.kind));
        debug!(device_id, %category, readings = updates.len(), "classified telemetry");

        let signals = self.store.apply(
            device_id,
            updates,
            &self.scoped_kinds(category, in_scope),
            now_ms,
        );
        Classification {
            applied: true,
            signals,
        }
    }
}

impl Default for TelemetryClassifier {
    fn default() -> Self {
        Self::new()
    }
}
