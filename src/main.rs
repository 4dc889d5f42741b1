//! batch-geocoder - cache-backed batch address resolver
//!
//! This is the composition root that wires together all the components.

use batch_geocoder::adapters::inbound::row_file;
use batch_geocoder::adapters::outbound::{HttpLookupConfig, HttpLookupService, SqliteResolutionCache};
use batch_geocoder::infrastructure::cancel_on_signal;
use batch_geocoder::{
    load_config, BatchObserver, BatchResolver, CancelToken, PacerConfig, ResultProjector,
    RowProgress,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;

/// Stops the batch once the lookup service has failed at the transport
/// level `limit` times in a row. A limit of zero never stops it.
struct StreakBreaker {
    limit: usize,
    cancel: CancelToken,
}

impl BatchObserver for StreakBreaker {
    fn on_row(&self, progress: &RowProgress<'_>) {
        if (progress.index + 1) % 100 == 0 {
            tracing::info!("processed {}/{} rows", progress.index + 1, progress.total);
        }
        if self.limit > 0 && progress.consecutive_transport_failures >= self.limit {
            tracing::error!(
                "{} consecutive transport failures, stopping batch",
                progress.consecutive_transport_failures
            );
            self.cancel.cancel();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    cfg.validate()?;

    tracing::info!(
        "starting batch-geocoder input={} cache={}",
        cfg.input_path,
        cfg.db_path
    );

    // ===== COMPOSITION ROOT =====

    // 1. Outbound adapters
    let cache = Arc::new(SqliteResolutionCache::open(&cfg.db_path)?);

    let lookup = Arc::new(HttpLookupService::new(HttpLookupConfig {
        api_url: cfg.api_url.clone(),
        api_key: cfg.api_key.clone().unwrap_or_default(),
        timeout: Duration::from_secs(cfg.request_timeout_secs),
    })?);

    // 2. Application service
    let resolver = BatchResolver::new(
        cache.clone(),
        lookup,
        PacerConfig {
            min_interval: Duration::from_millis(cfg.delay_ms),
        },
    );

    // 3. Inbound: rows in
    let mut rows = row_file::read_rows(&cfg.input_path)?;
    let addresses = row_file::addresses(&rows, cfg.skip_prefilled);
    tracing::info!("loaded {} rows from {}", rows.len(), cfg.input_path);

    let cancel = CancelToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let observer = StreakBreaker {
        limit: cfg.max_consecutive_failures as usize,
        cancel: cancel.clone(),
    };

    let result = resolver
        .resolve_batch_with(&addresses, &cancel, &observer)
        .await;

    // 4. Project and write rows out
    let projection = ResultProjector::project(result.outcomes(), &row_file::existing_fields(&rows));
    row_file::apply_projection(&mut rows, &projection);
    row_file::write_json(&cfg.output_path, &rows)?;

    let unresolved = row_file::write_unresolved_report(&cfg.failed_path, &rows)?;
    if unresolved.is_empty() {
        tracing::info!("every row with an address has coordinates");
    } else {
        tracing::warn!(
            "{} rows need manual correction, see {}",
            unresolved.len(),
            cfg.failed_path
        );
    }

    for failure in result.failure_ledger() {
        tracing::debug!("row {} '{}': {}", failure.row, failure.address, failure.reason);
    }

    if !result.storage_failures().is_empty() {
        tracing::error!(
            "{} resolved addresses could not be cached and will be looked up again next run",
            result.storage_failures().len()
        );
    }

    tracing::info!(
        "done: resolved={} failed={} skipped={} cache_hits={} service_calls={} cancelled={} cached_total={}",
        projection.success_count,
        projection.failure_count,
        projection.skipped_count,
        result.cache_hits(),
        result.service_calls(),
        result.is_cancelled(),
        cache.len().unwrap_or(0)
    );

    Ok(())
}
