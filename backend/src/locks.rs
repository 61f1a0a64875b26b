use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Async mutexes created on demand per key and dropped once nobody holds or
/// waits on them.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    entries: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }
}

impl<K: Clone + Eq + Hash> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: K) -> KeyedGuard<'_, K> {
        let entry = {
            // Entries are inserted and removed whole, so a poisoned map is still consistent.
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(entries.entry(key.clone()).or_default())
        };

        let guard = Arc::clone(&entry).lock_owned().await;
        KeyedGuard {
            locks: self,
            key,
            entry,
            guard: Some(guard),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct KeyedGuard<'a, K: Clone + Eq + Hash> {
    locks: &'a KeyedLocks<K>,
    key: K,
    entry: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K: Clone + Eq + Hash> Drop for KeyedGuard<'_, K> {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut entries = self.locks.entries.lock().unwrap_or_else(|e| e.into_inner());
        // Only the map and this guard still reference the mutex.
        if Arc::strong_count(&self.entry) == 2 {
            entries.remove(&self.key);
        }
    }
}
