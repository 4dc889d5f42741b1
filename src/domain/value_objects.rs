//! Value Objects - Immutable domain primitives
//!
//! Value objects are identified by their value rather than identity.
//! They are immutable and can be freely shared.

use serde::{Deserialize, Serialize};

/// A raw, human-entered address as supplied by the caller.
///
/// An address may be empty or whitespace-only. That is not an error,
/// it simply means there is nothing to resolve for that row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The address exactly as it was entered.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for empty or whitespace-only input.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Derive the cache identity for this address.
    ///
    /// Returns None for blank addresses, which never touch the cache.
    pub fn normalize(&self) -> Option<NormalizedKey> {
        NormalizedKey::from_raw(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<Option<String>> for Address {
    fn from(s: Option<String>) -> Self {
        Self(s.unwrap_or_default())
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical form of an address, used as the cache primary key.
///
/// Normalization trims the input, collapses every whitespace run into a
/// single space and lowercases the result. Two addresses that normalize
/// to the same string share one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedKey(String);

impl NormalizedKey {
    /// Normalize a raw address string.
    ///
    /// # Examples
    /// ```
    /// use batch_geocoder::NormalizedKey;
    ///
    /// let key = NormalizedKey::from_raw("  Seoul   City Hall ").unwrap();
    /// assert_eq!(key.as_str(), "seoul city hall");
    /// assert!(NormalizedKey::from_raw("   ").is_none());
    /// ```
    pub fn from_raw(raw: &str) -> Option<Self> {
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            return None;
        }
        Some(Self(collapsed.to_lowercase()))
    }

    /// Rebuild a key that was already normalized (e.g. read back from storage).
    pub(crate) fn from_stored(key: String) -> Self {
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
