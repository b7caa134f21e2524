//! Per-key async locks.
//!
//! Mutating media operations on one owner run one at a time; operations on
//! different owners never wait on each other.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// A set of async mutexes created on demand, one per key.
///
/// Idle entries are pruned whenever a new lock is taken, so the map only
/// holds keys that are currently locked or awaited.
pub struct KeyedLocks<K> {
    inner: Arc<Mutex<HashMap<K, Arc<AsyncMutex<()>>>>>,
}

impl<K> Clone for KeyedLocks<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`. Access is released when the guard drops.
    pub async fn lock(&self, key: K) -> OwnedMutexGuard<()> {
        let mutex = {
            // A panic while holding the map lock cannot leave the map inconsistent.
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            map.retain(|_, m| Arc::strong_count(m) > 1);
            Arc::clone(map.entry(key).or_default())
        };
        mutex.lock_owned().await
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
