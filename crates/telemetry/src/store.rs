//! Signal store: latched and instantaneous signal state per device.
//!
//! State is sharded per device. The outer map is only write-locked to insert
//! a new device, so messages for different devices never contend on the same
//! entry lock, and all updates from one message are applied under a single
//! per-device lock.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::signal::{Signal, SignalKind, SignalUpdate};

type DeviceSignals = BTreeMap<SignalKind, Signal>;

/// Thread-safe store of every device's signals.
#[derive(Debug, Default)]
pub struct SignalStore {
    devices: RwLock<HashMap<String, Arc<Mutex<DeviceSignals>>>>,
}

impl SignalStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn existing(&self, device_id: &str) -> Option<Arc<Mutex<DeviceSignals>>> {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(device_id)
            .cloned()
    }

    fn entry(&self, device_id: &str) -> Arc<Mutex<DeviceSignals>> {
        if let Some(entry) = self.existing(device_id) {
            return entry;
        }
        self.devices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(device_id.to_string())
            .or_default()
            .clone()
    }

    /// Fold updates into a device's signals, then return the current state
    /// of `kinds`. Both steps happen under one device lock.
    pub fn apply(
        &self,
        device_id: &str,
        updates: Vec<SignalUpdate>,
        kinds: &[SignalKind],
        now_ms: u64,
    ) -> Vec<Signal> {
        let entry = self.entry(device_id);
        let mut signals = entry.lock().unwrap_or_else(PoisonError::into_inner);

        for update in updates {
            match signals.get_mut(&update.kind) {
                Some(signal) => {
                    signal.apply(update, now_ms);
                }
                None => {
                    let kind = update.kind;
                    signals.insert(kind, Signal::new(device_id, update, now_ms));
                }
            }
        }

        collect(&signals, kinds)
    }

    /// Current state of `kinds` for a device, skipping kinds never written.
    pub fn select(&self, device_id: &str, kinds: &[SignalKind]) -> Vec<Signal> {
        match self.existing(device_id) {
            Some(entry) => collect(&entry.lock().unwrap_or_else(PoisonError::into_inner), kinds),
            None => Vec::new(),
        }
    }

    pub fn get(&self, device_id: &str, kind: SignalKind) -> Option<Signal> {
        self.select(device_id, &[kind]).into_iter().next()
    }

    /// Every signal stored for a device, ordered by kind.
    pub fn snapshot(&self, device_id: &str) -> Vec<Signal> {
        match self.existing(device_id) {
            Some(entry) => entry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .values()
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn device_count(&self) -> usize {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn signal_count(&self) -> usize {
        let devices: Vec<_> = self
            .devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        devices
            .iter()
            .map(|entry| entry.lock().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }
}

fn collect(signals: &DeviceSignals, kinds: &[SignalKind]) -> Vec<Signal> {
    kinds
        .iter()
        .filter_map(|kind| signals.get(kind).cloned())
        .collect()
}
