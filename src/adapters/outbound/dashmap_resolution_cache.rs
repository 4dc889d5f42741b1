//! DashMap Resolution Cache
//!
//! Implements ResolutionCache in memory. Nothing survives the process;
//! useful for dry runs and tests.

use crate::domain::entities::ResolvedLocation;
use crate::domain::errors::StorageError;
use crate::domain::ports::ResolutionCache;
use crate::domain::value_objects::NormalizedKey;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory resolution cache.
pub struct DashMapResolutionCache {
    entries: DashMap<NormalizedKey, ResolvedLocation>,
    writes: AtomicUsize,
}

impl DashMapResolutionCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total `store` calls, including overwrites.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

impl Default for DashMapResolutionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolutionCache for DashMapResolutionCache {
    fn lookup(&self, key: &NormalizedKey) -> Option<ResolvedLocation> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    fn store(&self, key: &NormalizedKey, location: &ResolvedLocation) -> Result<(), StorageError> {
        self.entries.insert(key.clone(), location.clone());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
