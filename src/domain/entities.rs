//! Domain Entities - Core business objects
//!
//! These entities represent the core concepts of the geocoding domain.
//! They have no I/O dependencies and contain only business logic.

use crate::domain::errors::LookupError;
use crate::domain::value_objects::{Address, NormalizedKey};
use serde::Serialize;

/// Coordinates outside the WGS84 ranges.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("coordinates out of range: lat={latitude} lng={longitude}")]
pub struct InvalidCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A coordinate pair plus the provider's canonical address string.
///
/// Immutable once created. Latitude is within [-90, 90] and longitude
/// within [-180, 180]; the constructor rejects anything else.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedLocation {
    latitude: f64,
    longitude: f64,
    resolved_address: String,
}

impl ResolvedLocation {
    pub fn new(
        latitude: f64,
        longitude: f64,
        resolved_address: impl Into<String>,
    ) -> Result<Self, InvalidCoordinates> {
        let lat_ok = latitude.is_finite() && (-90.0..=90.0).contains(&latitude);
        let lng_ok = longitude.is_finite() && (-180.0..=180.0).contains(&longitude);
        if !lat_ok || !lng_ok {
            return Err(InvalidCoordinates {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
            resolved_address: resolved_address.into(),
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn resolved_address(&self) -> &str {
        &self.resolved_address
    }

    /// The `"<lat>,<lng>"` form written into the caller's geocoding field.
    ///
    /// Whole degrees keep their fractional part (`37.0`, not `37`).
    pub fn to_field(&self) -> String {
        format!("{:?},{:?}", self.latitude, self.longitude)
    }
}

/// A persisted resolution, as held by the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: NormalizedKey,
    pub location: ResolvedLocation,
    /// Seconds since the Unix epoch
    pub cached_at: u64,
}

/// What happened to one input row.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionOutcome {
    /// Resolved from the cache or the lookup service
    Resolved(ResolvedLocation),
    /// Attempted and not resolved
    Failed(LookupError),
    /// Blank address, or not reached before cancellation
    Skipped,
}

impl ResolutionOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    pub fn location(&self) -> Option<&ResolvedLocation> {
        match self {
            Self::Resolved(loc) => Some(loc),
            _ => None,
        }
    }
}

/// One entry of the failure ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureRecord {
    /// 1-based position of the row in the submitted batch
    pub row: usize,
    pub address: Address,
    pub reason: LookupError,
}

impl FailureRecord {
    /// 0-based index into the outcome sequence.
    pub fn index(&self) -> usize {
        self.row - 1
    }
}

/// A row that resolved correctly but whose cache write failed.
///
/// Kept apart from the failure ledger: the row's value is correct, only
/// its durability is at risk (a rerun would pay for the call again).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageFailure {
    /// 1-based position of the row in the submitted batch
    pub row: usize,
    pub key: NormalizedKey,
    pub reason: String,
}

/// Result of one batch invocation.
///
/// Built fresh per call and never modified after it is returned.
#[derive(Debug, Clone)]
pub struct BatchResult {
    outcomes: Vec<ResolutionOutcome>,
    failure_ledger: Vec<FailureRecord>,
    storage_failures: Vec<StorageFailure>,
    cancelled: bool,
    cache_hits: usize,
    service_calls: usize,
    consecutive_transport_failures: usize,
}

impl BatchResult {
    pub(crate) fn new(
        outcomes: Vec<ResolutionOutcome>,
        failure_ledger: Vec<FailureRecord>,
        storage_failures: Vec<StorageFailure>,
        cancelled: bool,
        cache_hits: usize,
        service_calls: usize,
        consecutive_transport_failures: usize,
    ) -> Self {
        Self {
            outcomes,
            failure_ledger,
            storage_failures,
            cancelled,
            cache_hits,
            service_calls,
            consecutive_transport_failures,
        }
    }

    /// One outcome per input row, in input order.
    pub fn outcomes(&self) -> &[ResolutionOutcome] {
        &self.outcomes
    }

    /// Rows that were attempted and not resolved, in input order.
    pub fn failure_ledger(&self) -> &[FailureRecord] {
        &self.failure_ledger
    }

    /// Rows whose resolution could not be persisted.
    pub fn storage_failures(&self) -> &[StorageFailure] {
        &self.storage_failures
    }

    /// True if the batch stopped early; trailing rows are `Skipped`.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn cache_hits(&self) -> usize {
        self.cache_hits
    }

    /// Number of calls issued to the lookup service.
    pub fn service_calls(&self) -> usize {
        self.service_calls
    }

    /// Transport failures in a row at the end of the batch.
    pub fn consecutive_transport_failures(&self) -> usize {
        self.consecutive_transport_failures
    }

    pub fn resolved_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_resolved()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.failure_ledger.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }
}
