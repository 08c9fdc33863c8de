//! Per-key lock manager.
//!
//! Serialises mutations of the same key without blocking unrelated keys.
//! Used by the repository layer to guard branch-head compare-and-swap
//! sequences.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Condvar, Mutex};

/// A set of currently held key locks, waited on through a condvar.
pub struct LockManager<K> {
    held: Mutex<HashSet<K>>,
    released: Condvar,
}

impl<K> Default for LockManager<K>
where
    K: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> LockManager<K>
where
    K: Clone + Eq + Hash,
{
    /// A manager with no locks held.
    pub fn new() -> Self {
        Self {
            held: Mutex::new(HashSet::new()),
            released: Condvar::new(),
        }
    }

    /// Acquire the lock for `key`, blocking while another guard holds it.
    ///
    /// The lock is released when the returned guard drops.
    pub fn lock(&self, key: K) -> KeyGuard<'_, K> {
        let mut held = self.held.lock().expect("lock manager poisoned");
        while held.contains(&key) {
            held = self
                .released
                .wait(held)
                .expect("lock manager poisoned");
        }
        held.insert(key.clone());
        KeyGuard { manager: self, key }
    }

    /// Returns `true` if some guard currently holds `key`.
    pub fn is_locked(&self, key: &K) -> bool {
        self.held
            .lock()
            .expect("lock manager poisoned")
            .contains(key)
    }
}

/// Guard for one key; releases the key on drop.
pub struct KeyGuard<'a, K>
where
    K: Clone + Eq + Hash,
{
    manager: &'a LockManager<K>,
    key: K,
}

impl<K> Drop for KeyGuard<'_, K>
where
    K: Clone + Eq + Hash,
{
    fn drop(&mut self) {
        let mut held = self
            .manager
            .held
            .lock()
            .expect("lock manager poisoned");
        held.remove(&self.key);
        self.manager.released.notify_all();
    }
}
