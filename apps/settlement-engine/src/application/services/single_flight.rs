//! Single-flight registry.
//!
//! At most one holder per key. The slot is released when the guard drops,
//! on success, failure or cancellation alike.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

/// Set of keys with an operation in progress.
#[derive(Debug)]
pub struct SingleFlight<K> {
    in_flight: Arc<Mutex<HashSet<K>>>,
}

impl<K> Default for SingleFlight<K> {
    fn default() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }
}

impl<K: Eq + Hash + Clone> SingleFlight<K> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`, or `None` if it is already claimed.
    #[must_use]
    pub fn try_acquire(&self, key: K) -> Option<FlightGuard<K>> {
        let mut set = self.in_flight.lock();
        if !set.insert(key.clone()) {
            return None;
        }
        Some(FlightGuard {
            key,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    /// Whether `key` is currently claimed.
    #[must_use]
    pub fn is_in_flight(&self, key: &K) -> bool {
        self.in_flight.lock().contains(key)
    }
}

/// Claim on a key; releases it on drop.
#[derive(Debug)]
pub struct FlightGuard<K: Eq + Hash> {
    key: K,
    in_flight: Arc<Mutex<HashSet<K>>>,
}

impl<K: Eq + Hash> FlightGuard<K> {
    /// Claimed key.
    #[must_use]
    pub const fn key(&self) -> &K {
        &self.key
    }
}

impl<K: Eq + Hash> Drop for FlightGuard<K> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.key);
    }
}
