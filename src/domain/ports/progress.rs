//! Batch Progress Port
//!
//! Lets the caller watch a batch row by row, e.g. to stop it once the
//! lookup service looks dead.

use crate::domain::entities::ResolutionOutcome;

/// Snapshot emitted after each processed row.
#[derive(Debug, Clone, Copy)]
pub struct RowProgress<'a> {
    /// 0-based index of the row just processed
    pub index: usize,
    pub total: usize,
    pub outcome: &'a ResolutionOutcome,
    /// Transport failures in a row, ending at this row (cache hits and skips
    /// leave the streak untouched, any other lookup outcome resets it)
    pub consecutive_transport_failures: usize,
}

/// Receives per-row progress from the batch resolver.
pub trait BatchObserver: Send + Sync {
    fn on_row(&self, progress: &RowProgress<'_>);
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl BatchObserver for NoopObserver {
    fn on_row(&self, _progress: &RowProgress<'_>) {}
}
