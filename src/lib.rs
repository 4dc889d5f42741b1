//! batch-geocoder Library
//!
//! Cache-backed batch geocoding: addresses are resolved from a persistent
//! cache first and from a remote lookup service only on a miss.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use application::BatchResolver;
pub use config::{load_config, Config, ConfigError};
pub use domain::entities::{
    BatchResult, CacheEntry, FailureRecord, ResolutionOutcome, ResolvedLocation, StorageFailure,
};
pub use domain::errors::{LookupError, StorageError};
pub use domain::ports::{BatchObserver, LookupService, NoopObserver, ResolutionCache, RowProgress};
pub use domain::services::{Projection, ResultProjector};
pub use domain::value_objects::{Address, NormalizedKey};
pub use infrastructure::{CancelToken, PacerConfig};
