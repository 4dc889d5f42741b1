//! Batch Resolver - Main application use case
//!
//! Resolves an ordered sequence of addresses using the resolution cache
//! first and the external lookup service only for misses.

use crate::domain::entities::{
    BatchResult, FailureRecord, ResolutionOutcome, ResolvedLocation, StorageFailure,
};
use crate::domain::errors::{LookupError, StorageError};
use crate::domain::ports::{BatchObserver, LookupService, NoopObserver, ResolutionCache, RowProgress};
use crate::domain::value_objects::{Address, NormalizedKey};
use crate::infrastructure::{CallPacer, CancelToken, KeyLocks, PacerConfig};
use std::sync::Arc;

/// How a single non-blank row was satisfied.
enum RowResolution {
    CacheHit(ResolvedLocation),
    Resolved {
        location: ResolvedLocation,
        stored: Result<(), StorageError>,
    },
    Failed(LookupError),
}

/// Batch resolver - main application use case.
///
/// For every row, in input order:
/// 1. Blank addresses are `Skipped` without touching cache or service
/// 2. Cache hits are `Resolved` with no call and no delay
/// 3. Misses go to the lookup service (paced); successes are written back
///    to the cache, failures land in the failure ledger
///
/// Failed lookups are never retried inside a batch. Rerunning the batch
/// later (typically after the address was corrected) is the retry path.
///
/// One resolver may be shared by concurrent batches: calls to the lookup
/// service are serialized by the pacer and a key is never resolved twice
/// at the same time.
pub struct BatchResolver {
    cache: Arc<dyn ResolutionCache>,
    lookup: Arc<dyn LookupService>,
    pacer: CallPacer,
    in_flight: KeyLocks,
}

impl BatchResolver {
    /// Create a new batch resolver.
    pub fn new(
        cache: Arc<dyn ResolutionCache>,
        lookup: Arc<dyn LookupService>,
        pacer: PacerConfig,
    ) -> Self {
        Self {
            cache,
            lookup,
            pacer: CallPacer::new(pacer),
            in_flight: KeyLocks::new(),
        }
    }

    /// Resolve a whole batch with no cancellation and no progress reporting.
    pub async fn resolve_batch(&self, addresses: &[Address]) -> BatchResult {
        self.resolve_batch_with(addresses, &CancelToken::new(), &NoopObserver)
            .await
    }

    /// Resolve a batch, checking `cancel` before each row and reporting
    /// every processed row to `observer`.
    ///
    /// Per-row failures never abort the batch. On cancellation the result
    /// holds everything computed so far and `Skipped` for the rest.
    #[tracing::instrument(name = "resolve_batch", skip_all, fields(rows = addresses.len()))]
    pub async fn resolve_batch_with(
        &self,
        addresses: &[Address],
        cancel: &CancelToken,
        observer: &dyn BatchObserver,
    ) -> BatchResult {
        let total = addresses.len();
        let mut outcomes = Vec::with_capacity(total);
        let mut ledger = Vec::new();
        let mut storage_failures = Vec::new();
        let mut cancelled = false;
        let mut cache_hits = 0;
        let mut service_calls = 0;
        let mut streak = 0;

        tracing::info!("resolving batch of {} addresses", total);

        for (index, address) in addresses.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::warn!("batch cancelled at row {} of {}", index + 1, total);
                cancelled = true;
                break;
            }

            let outcome = match address.normalize() {
                None => ResolutionOutcome::Skipped,
                Some(key) => match self.resolve_row(address, &key).await {
                    RowResolution::CacheHit(location) => {
                        cache_hits += 1;
                        ResolutionOutcome::Resolved(location)
                    }
                    RowResolution::Resolved { location, stored } => {
                        service_calls += 1;
                        streak = 0;
                        if let Err(e) = stored {
                            tracing::error!(
                                "row {}: resolved '{}' but could not cache it: {}",
                                index + 1,
                                address,
                                e
                            );
                            storage_failures.push(StorageFailure {
                                row: index + 1,
                                key: key.clone(),
                                reason: e.to_string(),
                            });
                        }
                        ResolutionOutcome::Resolved(location)
                    }
                    RowResolution::Failed(reason) => {
                        service_calls += 1;
                        if reason.is_transport() {
                            streak += 1;
                        } else {
                            streak = 0;
                        }
                        tracing::warn!("row {}: failed to resolve '{}': {}", index + 1, address, reason);
                        ledger.push(FailureRecord {
                            row: index + 1,
                            address: address.clone(),
                            reason: reason.clone(),
                        });
                        ResolutionOutcome::Failed(reason)
                    }
                },
            };

            observer.on_row(&RowProgress {
                index,
                total,
                outcome: &outcome,
                consecutive_transport_failures: streak,
            });
            outcomes.push(outcome);
        }

        outcomes.resize(total, ResolutionOutcome::Skipped);

        let result = BatchResult::new(
            outcomes,
            ledger,
            storage_failures,
            cancelled,
            cache_hits,
            service_calls,
            streak,
        );

        tracing::info!(
            "batch done: total={} resolved={} failed={} skipped={} cache_hits={} calls={}",
            total,
            result.resolved_count(),
            result.failed_count(),
            result.skipped_count(),
            result.cache_hits(),
            result.service_calls()
        );

        result
    }

    /// Resolve one non-blank row from the cache or the lookup service.
    async fn resolve_row(&self, address: &Address, key: &NormalizedKey) -> RowResolution {
        if let Some(location) = self.cache.lookup(key) {
            tracing::debug!("cache hit for '{}'", key);
            return RowResolution::CacheHit(location);
        }

        let _key_guard = self.in_flight.lock(key).await;

        // another batch may have resolved this key while we waited
        if let Some(location) = self.cache.lookup(key) {
            tracing::debug!("cache hit for '{}' after waiting on in-flight lookup", key);
            return RowResolution::CacheHit(location);
        }

        tracing::debug!("cache miss for '{}', calling lookup service", key);
        let looked = {
            let _permit = self.pacer.acquire().await;
            self.lookup.resolve(address).await
        };

        // written while the key is still held so waiters find it cached
        match looked {
            Ok(location) => {
                let stored = self.store_blocking(key, &location).await;
                RowResolution::Resolved { location, stored }
            }
            Err(reason) => RowResolution::Failed(reason),
        }
    }

    /// Cache writes sync to disk, so they run on the blocking pool.
    async fn store_blocking(
        &self,
        key: &NormalizedKey,
        location: &ResolvedLocation,
    ) -> Result<(), StorageError> {
        let cache = Arc::clone(&self.cache);
        let key = key.clone();
        let location = location.clone();

        tokio::task::spawn_blocking(move || cache.store(&key, &location))
            .await
            .map_err(|e| StorageError::Interrupted(e.to_string()))?
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::adapters::outbound::DashMapResolutionCache;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::time::{Duration, Instant};
    use tracing_test::traced_test;

    /// Scripted lookup service that records every call.
    struct FakeLookup {
        answers: HashMap<String, Result<ResolvedLocation, LookupError>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeLookup {
        fn new() -> Self {
            Self {
                answers: HashMap::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with(mut self, address: &str, answer: Result<ResolvedLocation, LookupError>) -> Self {
            self.answers.insert(address.to_string(), answer);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl LookupService for FakeLookup {
        async fn resolve(&self, address: &Address) -> Result<ResolvedLocation, LookupError> {
            self.calls.lock().push(address.as_str().to_string());
            self.answers
                .get(address.as_str())
                .cloned()
                .unwrap_or(Err(LookupError::NotFound))
        }
    }

    /// Cache whose writes always fail.
    struct ReadOnlyCache;

    impl ResolutionCache for ReadOnlyCache {
        fn lookup(&self, _key: &NormalizedKey) -> Option<ResolvedLocation> {
            None
        }

        fn store(&self, _key: &NormalizedKey, _location: &ResolvedLocation) -> Result<(), StorageError> {
            Err(StorageError::Write(rusqlite::Error::InvalidQuery))
        }
    }

    /// Cache whose writes block the calling thread, like a synced disk write.
    struct SlowDiskCache {
        inner: DashMapResolutionCache,
        write_time: Duration,
    }

    impl ResolutionCache for SlowDiskCache {
        fn lookup(&self, key: &NormalizedKey) -> Option<ResolvedLocation> {
            self.inner.lookup(key)
        }

        fn store(&self, key: &NormalizedKey, location: &ResolvedLocation) -> Result<(), StorageError> {
            std::thread::sleep(self.write_time);
            self.inner.store(key, location)
        }
    }

    fn city_hall() -> ResolvedLocation {
        ResolvedLocation::new(37.5663, 126.9779, "Seoul City Hall").unwrap()
    }

    fn addresses(raw: &[&str]) -> Vec<Address> {
        raw.iter().map(|s| Address::from(*s)).collect()
    }

    fn resolver(
        cache: Arc<dyn ResolutionCache>,
        lookup: Arc<dyn LookupService>,
        delay_ms: u64,
    ) -> BatchResolver {
        BatchResolver::new(
            cache,
            lookup,
            PacerConfig {
                min_interval: Duration::from_millis(delay_ms),
            },
        )
    }

    #[tokio::test]
    async fn test_seoul_scenario() {
        let lookup = Arc::new(FakeLookup::new().with("Seoul City Hall", Ok(city_hall())));
        let cache = Arc::new(DashMapResolutionCache::new());
        let resolver = resolver(cache.clone(), lookup.clone(), 0);

        let input = addresses(&["", "Seoul City Hall", "Seoul City Hall", "Nonexistent Place 9999"]);
        let result = resolver.resolve_batch(&input).await;

        assert_eq!(
            result.outcomes(),
            &[
                ResolutionOutcome::Skipped,
                ResolutionOutcome::Resolved(city_hall()),
                ResolutionOutcome::Resolved(city_hall()),
                ResolutionOutcome::Failed(LookupError::NotFound),
            ]
        );
        assert_eq!(lookup.calls(), vec!["Seoul City Hall", "Nonexistent Place 9999"]);
        assert_eq!(result.failure_ledger().len(), 1);
        assert_eq!(result.failure_ledger()[0].row, 4);
        assert_eq!(result.failure_ledger()[0].address.as_str(), "Nonexistent Place 9999");
        assert_eq!(result.cache_hits(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_rerun_uses_cache_only() {
        let lookup = Arc::new(FakeLookup::new().with("Seoul City Hall", Ok(city_hall())));
        let cache = Arc::new(DashMapResolutionCache::new());
        let resolver = resolver(cache, lookup.clone(), 0);
        let input = addresses(&["Seoul City Hall", "Seoul City Hall"]);

        resolver.resolve_batch(&input).await;
        let calls_after_first = lookup.calls().len();
        let second = resolver.resolve_batch(&input).await;

        assert_eq!(calls_after_first, 1);
        assert_eq!(lookup.calls().len(), 1);
        assert_eq!(second.service_calls(), 0);
        assert_eq!(second.cache_hits(), 2);
    }

    #[tokio::test]
    async fn test_normalized_duplicates_share_one_call() {
        let lookup = Arc::new(FakeLookup::new().with("Seoul City Hall", Ok(city_hall())));
        let resolver = resolver(Arc::new(DashMapResolutionCache::new()), lookup.clone(), 0);

        let input = addresses(&["Seoul City Hall", "  seoul   CITY hall "]);
        let result = resolver.resolve_batch(&input).await;

        assert_eq!(lookup.calls().len(), 1);
        assert_eq!(result.resolved_count(), 2);
    }

    #[tokio::test]
    async fn test_blank_rows_never_reach_service() {
        let lookup = Arc::new(FakeLookup::new());
        let resolver = resolver(Arc::new(DashMapResolutionCache::new()), lookup.clone(), 0);

        let input = addresses(&["", "   ", "\t"]);
        let result = resolver.resolve_batch(&input).await;

        assert!(lookup.calls().is_empty());
        assert_eq!(result.skipped_count(), 3);
        assert!(result.failure_ledger().is_empty());
    }

    #[tokio::test]
    async fn test_failed_rows_are_not_retried_within_batch() {
        let lookup = Arc::new(FakeLookup::new());
        let resolver = resolver(Arc::new(DashMapResolutionCache::new()), lookup.clone(), 0);

        let input = addresses(&["nowhere", "nowhere"]);
        let result = resolver.resolve_batch(&input).await;

        // failures are not cached, so each row pays exactly one call
        assert_eq!(lookup.calls().len(), 2);
        let rows: Vec<usize> = result.failure_ledger().iter().map(|f| f.row).collect();
        assert_eq!(rows, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_ledger_keeps_error_kind() {
        let lookup = Arc::new(
            FakeLookup::new()
                .with("a", Err(LookupError::TransportError("503".into())))
                .with("b", Err(LookupError::InvalidResponse("bad".into()))),
        );
        let resolver = resolver(Arc::new(DashMapResolutionCache::new()), lookup, 0);

        let result = resolver.resolve_batch(&addresses(&["a", "b", "c"])).await;
        let reasons: Vec<&LookupError> = result.failure_ledger().iter().map(|f| &f.reason).collect();

        assert_eq!(
            reasons,
            vec![
                &LookupError::TransportError("503".into()),
                &LookupError::InvalidResponse("bad".into()),
                &LookupError::NotFound,
            ]
        );
    }

    #[tokio::test]
    async fn test_storage_failure_keeps_row_resolved() {
        let lookup = Arc::new(FakeLookup::new().with("Seoul City Hall", Ok(city_hall())));
        let resolver = resolver(Arc::new(ReadOnlyCache), lookup, 0);

        let result = resolver.resolve_batch(&addresses(&["Seoul City Hall"])).await;

        assert_eq!(result.outcomes(), &[ResolutionOutcome::Resolved(city_hall())]);
        assert!(result.failure_ledger().is_empty());
        assert_eq!(result.storage_failures().len(), 1);
        assert_eq!(result.storage_failures()[0].row, 1);
    }

    #[tokio::test]
    async fn test_cache_write_does_not_block_runtime() {
        let cache = Arc::new(SlowDiskCache {
            inner: DashMapResolutionCache::new(),
            write_time: Duration::from_millis(150),
        });
        let lookup = Arc::new(FakeLookup::new().with("Seoul City Hall", Ok(city_hall())));
        let resolver = resolver(cache.clone(), lookup, 0);
        let batch = addresses(&["Seoul City Hall"]);

        // single-threaded runtime: the ticker only runs if the write is off-thread
        let (batch_done, ticked) = tokio::join!(
            async {
                resolver.resolve_batch(&batch).await;
                Instant::now()
            },
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Instant::now()
            }
        );

        assert!(ticked < batch_done);
        assert_eq!(cache.inner.len(), 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_storage_failure_is_logged() {
        let lookup = Arc::new(FakeLookup::new().with("Seoul City Hall", Ok(city_hall())));
        let resolver = resolver(Arc::new(ReadOnlyCache), lookup, 0);

        resolver.resolve_batch(&addresses(&["Seoul City Hall"])).await;

        assert!(logs_contain("could not cache it"));
    }

    #[tokio::test]
    async fn test_transport_streak_is_tracked() {
        let lookup = Arc::new(
            FakeLookup::new()
                .with("t1", Err(LookupError::TransportError("down".into())))
                .with("t2", Err(LookupError::TransportError("down".into())))
                .with("ok", Ok(city_hall()))
                .with("t3", Err(LookupError::TransportError("down".into()))),
        );
        let resolver = resolver(Arc::new(DashMapResolutionCache::new()), lookup, 0);

        let first = resolver.resolve_batch(&addresses(&["t1", "t2"])).await;
        let second = resolver.resolve_batch(&addresses(&["t1", "ok", "t3"])).await;

        assert_eq!(first.consecutive_transport_failures(), 2);
        assert_eq!(second.consecutive_transport_failures(), 1);
    }

    #[tokio::test]
    async fn test_cancel_before_start_skips_everything() {
        let lookup = Arc::new(FakeLookup::new());
        let resolver = resolver(Arc::new(DashMapResolutionCache::new()), lookup.clone(), 0);
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = resolver
            .resolve_batch_with(&addresses(&["a", "b"]), &cancel, &NoopObserver)
            .await;

        assert!(result.is_cancelled());
        assert_eq!(result.outcomes().len(), 2);
        assert_eq!(result.skipped_count(), 2);
        assert!(lookup.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_from_observer_keeps_progress() {
        struct CancelAfterFirst(CancelToken);

        impl BatchObserver for CancelAfterFirst {
            fn on_row(&self, progress: &RowProgress<'_>) {
                if progress.index == 0 {
                    self.0.cancel();
                }
            }
        }

        let lookup = Arc::new(FakeLookup::new().with("Seoul City Hall", Ok(city_hall())));
        let resolver = resolver(Arc::new(DashMapResolutionCache::new()), lookup.clone(), 0);
        let cancel = CancelToken::new();

        let result = resolver
            .resolve_batch_with(
                &addresses(&["Seoul City Hall", "b", "c"]),
                &cancel,
                &CancelAfterFirst(cancel.clone()),
            )
            .await;

        assert!(result.is_cancelled());
        assert_eq!(
            result.outcomes(),
            &[
                ResolutionOutcome::Resolved(city_hall()),
                ResolutionOutcome::Skipped,
                ResolutionOutcome::Skipped,
            ]
        );
        assert_eq!(lookup.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_observer_sees_every_row_in_order() {
        struct Recorder(Mutex<Vec<(usize, usize)>>);

        impl BatchObserver for Recorder {
            fn on_row(&self, progress: &RowProgress<'_>) {
                self.0.lock().push((progress.index, progress.total));
            }
        }

        let resolver = resolver(
            Arc::new(DashMapResolutionCache::new()),
            Arc::new(FakeLookup::new()),
            0,
        );
        let recorder = Recorder(Mutex::new(Vec::new()));

        resolver
            .resolve_batch_with(&addresses(&["", "x", ""]), &CancelToken::new(), &recorder)
            .await;

        assert_eq!(*recorder.0.lock(), vec![(0, 3), (1, 3), (2, 3)]);
    }

    #[tokio::test]
    async fn test_cache_hits_and_skips_cost_no_delay() {
        let lookup = Arc::new(FakeLookup::new().with("Seoul City Hall", Ok(city_hall())));
        let cache = Arc::new(DashMapResolutionCache::new());
        let resolver = resolver(cache, lookup, 200);

        resolver.resolve_batch(&addresses(&["Seoul City Hall"])).await;

        let start = Instant::now();
        let input = addresses(&["Seoul City Hall", "", "Seoul City Hall", "  "]);
        let result = resolver.resolve_batch(&input).await;

        assert_eq!(result.service_calls(), 0);
        assert!(start.elapsed() < Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_misses_are_paced() {
        let lookup = Arc::new(FakeLookup::new());
        let resolver = resolver(Arc::new(DashMapResolutionCache::new()), lookup, 40);

        let start = Instant::now();
        resolver.resolve_batch(&addresses(&["a", "b", "c"])).await;

        // three calls, two gaps
        assert!(start.elapsed() >= Duration::from_millis(75));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let resolver = resolver(
            Arc::new(DashMapResolutionCache::new()),
            Arc::new(FakeLookup::new()),
            0,
        );

        let result = resolver.resolve_batch(&[]).await;

        assert!(result.outcomes().is_empty());
        assert!(!result.is_cancelled());
    }
}
