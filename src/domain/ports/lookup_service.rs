//! Lookup Service Port
//!
//! Defines the interface for the external, rate-limited geocoding service.

use crate::domain::entities::ResolvedLocation;
use crate::domain::errors::LookupError;
use crate::domain::value_objects::Address;
use async_trait::async_trait;

/// Single-address resolution call.
///
/// This is an outbound port that abstracts the vendor API. One address per
/// call; when the service returns several candidates only the first is used.
#[async_trait]
pub trait LookupService: Send + Sync {
    async fn resolve(&self, address: &Address) -> Result<ResolvedLocation, LookupError>;
}
