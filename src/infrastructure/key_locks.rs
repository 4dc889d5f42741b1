//! Per-Key Locks
//!
//! Guarantees at most one in-flight resolution per normalized key, even
//! when several batches share one resolver.

use crate::domain::value_objects::NormalizedKey;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lazily created async mutex per key.
///
/// Entries are dropped again once nobody holds or waits for them, so the
/// map only ever contains keys that are currently being resolved.
#[derive(Default)]
pub struct KeyLocks {
    locks: DashMap<NormalizedKey, Arc<Mutex<()>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &NormalizedKey) -> KeyGuard<'_> {
        let mutex = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let guard = mutex.lock_owned().await;

        KeyGuard {
            owner: self,
            key: key.clone(),
            guard: Some(guard),
        }
    }

    /// Number of keys currently locked or awaited.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Held while a key is being resolved.
pub struct KeyGuard<'a> {
    owner: &'a KeyLocks,
    key: NormalizedKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        // release before checking the count, the guard holds an Arc too
        self.guard.take();
        self.owner
            .locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
