//! Domain Errors
//!
//! Failure modes of the lookup service and the resolution cache.

use serde::{Deserialize, Serialize};

/// Why a single-address lookup did not produce a location.
///
/// The batch resolver treats every variant the same way (the row becomes
/// `Failed`) but keeps the variant in the failure ledger for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum LookupError {
    /// The service answered but had no candidate for the address.
    #[error("no match found")]
    NotFound,
    /// The request did not complete or the service answered with an error status.
    #[error("transport error: {0}")]
    TransportError(String),
    /// The service answered with something that could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl LookupError {
    /// Transport errors are the only ones that hint at a dead dependency.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::TransportError(_))
    }
}

/// Failure of the durable cache backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to open cache store at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("cache write failed: {0}")]
    Write(#[source] rusqlite::Error),
    #[error("cache read failed: {0}")]
    Read(#[source] rusqlite::Error),
    #[error("cache write did not complete: {0}")]
    Interrupted(String),
}
