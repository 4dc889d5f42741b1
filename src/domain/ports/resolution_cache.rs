//! Resolution Cache Port
//!
//! Defines the interface for the durable address -> location store.
//! Implementations may use SQLite or in-memory storage.

use crate::domain::entities::ResolvedLocation;
use crate::domain::errors::StorageError;
use crate::domain::value_objects::NormalizedKey;

/// Durable mapping from normalized address to resolved location.
///
/// This is an outbound port. The batch resolver consults it before every
/// external lookup and writes every successful lookup back into it.
/// Entries are never evicted by the core.
pub trait ResolutionCache: Send + Sync {
    /// Point lookup by key.
    ///
    /// Absence is a normal outcome. Backend read problems are reported
    /// as a miss rather than an error.
    fn lookup(&self, key: &NormalizedKey) -> Option<ResolvedLocation>;

    /// Insert or overwrite the entry for `key`.
    ///
    /// Must be durable before returning. Storing the same key twice
    /// replaces the previous entry wholesale.
    fn store(&self, key: &NormalizedKey, location: &ResolvedLocation) -> Result<(), StorageError>;
}
