//! Discovery registry: which (device, category) pairs have been seen.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::info;

use crate::category::Category;

/// Grow-only set of discovered (device, category) pairs.
///
/// `register_if_new` is an atomic check-and-set per pair: among concurrent
/// callers registering the same pair exactly one observes `true`.
#[derive(Debug, Default)]
pub struct DiscoveryRegistry {
    devices: RwLock<HashMap<String, Arc<Mutex<BTreeSet<Category>>>>>,
}

impl DiscoveryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn existing(&self, device_id: &str) -> Option<Arc<Mutex<BTreeSet<Category>>>> {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(device_id)
            .cloned()
    }

    /// Record a pair; returns true only the first time it is seen.
    pub fn register_if_new(&self, device_id: &str, category: Category) -> bool {
        let entry = match self.existing(device_id) {
            Some(entry) => entry,
            None => self
                .devices
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(device_id.to_string())
                .or_default()
                .clone(),
        };

        let inserted = entry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(category);
        if inserted {
            info!(device_id, %category, "discovered new device category");
        }
        inserted
    }

    pub fn is_known(&self, device_id: &str, category: Category) -> bool {
        self.existing(device_id)
            .map(|entry| {
                entry
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .contains(&category)
            })
            .unwrap_or(false)
    }

    /// Categories seen for a device, in declaration order.
    pub fn categories(&self, device_id: &str) -> Vec<Category> {
        self.existing(device_id)
            .map(|entry| {
                entry
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .iter()
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Device ids seen so far, sorted.
    pub fn devices(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    pub fn device_count(&self) -> usize {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of discovered pairs.
    pub fn len(&self) -> usize {
        self.devices()
            .iter()
            .map(|device| self.categories(device).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
