//! Per-key mutual exclusion.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use crate::error::CoreResult;

/// One mutex per key, created on first use.
///
/// Operations on different keys run in parallel; operations on the same key
/// are serialized for the duration of the closure.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    slots: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Ord + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &K) -> CoreResult<Arc<Mutex<()>>> {
        let mut slots = self.slots.lock()?;
        Ok(Arc::clone(slots.entry(key.clone()).or_default()))
    }

    /// Run `f` while holding the lock for `key`.
    pub fn with_lock<R>(&self, key: &K, f: impl FnOnce() -> CoreResult<R>) -> CoreResult<R> {
        let slot = self.slot(key)?;
        let _guard = slot.lock()?;
        f()
    }

    /// Run `f` while holding the locks for every key in `keys`.
    ///
    /// Locks are taken in key order so two callers with overlapping key sets
    /// cannot deadlock.
    pub fn with_locks<R>(&self, keys: &[K], f: impl FnOnce() -> CoreResult<R>) -> CoreResult<R> {
        let mut keys = keys.to_vec();
        keys.sort();
        keys.dedup();

        let slots = keys
            .iter()
            .map(|key| self.slot(key))
            .collect::<CoreResult<Vec<_>>>()?;
        let mut guards = Vec::with_capacity(slots.len());
        for slot in &slots {
            guards.push(slot.lock()?);
        }
        f()
    }

    /// Drop slots nobody is holding.
    pub fn prune(&self) -> CoreResult<usize> {
        let mut slots = self.slots.lock()?;
        let before = slots.len();
        slots.retain(|_, slot| Arc::strong_count(slot) > 1);
        Ok(before - slots.len())
    }

    pub fn len(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
