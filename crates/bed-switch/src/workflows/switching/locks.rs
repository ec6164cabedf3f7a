use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const PRUNE_THRESHOLD: usize = 1024;

/// In-process exclusive locks keyed by resource id.
#[derive(Debug)]
pub(crate) struct LockTable<K> {
    slots: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for LockTable<K> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Ord + Clone> LockTable<K> {
    pub(crate) fn slot(&self, key: &K) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots.len() > PRUNE_THRESHOLD {
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
        }
        slots.entry(key.clone()).or_default().clone()
    }

    /// Slots for several keys, sorted and deduplicated so callers always lock in the same order.
    pub(crate) fn slots<'k>(&self, keys: impl IntoIterator<Item = &'k K>) -> Vec<Arc<Mutex<()>>>
    where
        K: 'k,
    {
        let mut keys: Vec<&K> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();
        keys.into_iter().map(|key| self.slot(key)).collect()
    }
}

/// The guarded value is `()`, so a poisoned lock carries no broken state.
pub(crate) fn hold(slot: &Mutex<()>) -> MutexGuard<'_, ()> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn hold_all(slots: &[Arc<Mutex<()>>]) -> Vec<MutexGuard<'_, ()>> {
    slots.iter().map(|slot| hold(slot)).collect()
}
