//! Per-key async mutual exclusion
//!
//! Read-modify-write cycles on the same profile (or the same user's session)
//! must not interleave. Each key gets its own `tokio` mutex, created on first
//! use and dropped once nobody holds or waits for it.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// A family of mutexes indexed by key
pub struct KeyedLocks<K> {
    slots: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

/// Holds one key until dropped
pub struct KeyGuard<'a, K: Eq + Hash + Clone> {
    locks: &'a KeyedLocks<K>,
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K: Eq + Hash + Clone + Ord> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &K) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    /// Wait for exclusive access to `key`
    ///
    /// The guard exists before the wait starts, so a waiter that is dropped
    /// mid-wait still prunes the slot if it was the last one referencing it.
    pub async fn lock(&self, key: K) -> KeyGuard<'_, K> {
        let slot = self.slot(&key);
        let mut held = KeyGuard {
            locks: self,
            key,
            guard: None,
        };
        held.guard = Some(slot.lock_owned().await);
        held
    }

    /// Lock two keys in ascending order so opposite-direction callers cannot deadlock
    pub async fn lock_pair(&self, a: K, b: K) -> Vec<KeyGuard<'_, K>> {
        if a == b {
            return vec![self.lock(a).await];
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let first = self.lock(first).await;
        let second = self.lock(second).await;
        vec![first, second]
    }

    /// Number of keys with a live mutex
    pub fn active_keys(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<K: Eq + Hash + Clone> Drop for KeyGuard<'_, K> {
    fn drop(&mut self) {
        drop(self.guard.take());

        // Also runs for a cancelled waiter, whose acquire future is already gone
        let mut slots = self.locks.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map still references the mutex: no holder, no waiter
        let idle = slots
            .get(&self.key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1);
        if idle {
            slots.remove(&self.key);
        }
    }
}
