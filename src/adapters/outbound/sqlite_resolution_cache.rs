//! SQLite Resolution Cache
//!
//! Implements ResolutionCache on a single SQLite file so resolutions
//! survive process restarts.

use crate::domain::entities::{CacheEntry, ResolvedLocation};
use crate::domain::errors::StorageError;
use crate::domain::ports::ResolutionCache;
use crate::domain::value_objects::NormalizedKey;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::time::{SystemTime, UNIX_EPOCH};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS geocoding_cache (
    address_key TEXT PRIMARY KEY,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    resolved_address TEXT NOT NULL,
    cached_at INTEGER NOT NULL
)";

/// SQLite-backed resolution cache.
///
/// Opened once at startup and injected into the resolver. All access goes
/// through one connection behind a lock, which makes `store` single-writer.
/// Every write is a synchronous autocommit statement, so it is on disk when
/// `store` returns.
pub struct SqliteResolutionCache {
    conn: Mutex<Connection>,
    path: String,
}

impl SqliteResolutionCache {
    /// Open (or create) the cache database at `path`.
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::Open {
            path: path.to_string(),
            source,
        })?;
        Self::init(conn, path)
    }

    /// Open a private, non-durable cache (mainly for tests).
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(|source| StorageError::Open {
            path: ":memory:".to_string(),
            source,
        })?;
        Self::init(conn, ":memory:")
    }

    fn init(conn: Connection, path: &str) -> Result<Self, StorageError> {
        let open_err = |source| StorageError::Open {
            path: path.to_string(),
            source,
        };

        conn.pragma_update(None, "synchronous", "FULL")
            .map_err(open_err)?;
        conn.execute(SCHEMA, []).map_err(open_err)?;

        tracing::info!("geocoding cache opened, path={}", path);

        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Full entry for `key`, including when it was cached.
    pub fn entry(&self, key: &NormalizedKey) -> Result<Option<CacheEntry>, StorageError> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT address_key, latitude, longitude, resolved_address, cached_at
                 FROM geocoding_cache
                 WHERE address_key = ?1",
                params![key.as_str()],
                Self::row_to_parts,
            )
            .optional()
            .map_err(StorageError::Read)?;

        Ok(row.and_then(|(key, lat, lng, resolved, cached_at)| {
            let location = Self::to_location(&key, lat, lng, resolved)?;
            Some(CacheEntry {
                key: NormalizedKey::from_stored(key),
                location,
                cached_at,
            })
        }))
    }

    /// Number of cached addresses.
    pub fn len(&self) -> Result<usize, StorageError> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM geocoding_cache", [], |row| row.get(0))
            .map_err(StorageError::Read)?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }

    /// Convert a SQLite row to its raw column values.
    fn row_to_parts(row: &Row) -> rusqlite::Result<(String, f64, f64, String, u64)> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get::<_, i64>(4)? as u64,
        ))
    }

    fn to_location(key: &str, lat: f64, lng: f64, resolved: String) -> Option<ResolvedLocation> {
        match ResolvedLocation::new(lat, lng, resolved) {
            Ok(location) => Some(location),
            Err(e) => {
                tracing::warn!("ignoring corrupt cache entry '{}': {}", key, e);
                None
            }
        }
    }

    fn now_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

impl ResolutionCache for SqliteResolutionCache {
    fn lookup(&self, key: &NormalizedKey) -> Option<ResolvedLocation> {
        match self.entry(key) {
            Ok(entry) => entry.map(|e| e.location),
            Err(e) => {
                tracing::warn!("cache lookup for '{}' failed, treating as miss: {}", key, e);
                None
            }
        }
    }

    fn store(&self, key: &NormalizedKey, location: &ResolvedLocation) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO geocoding_cache
             (address_key, latitude, longitude, resolved_address, cached_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                key.as_str(),
                location.latitude(),
                location.longitude(),
                location.resolved_address(),
                Self::now_secs() as i64,
            ],
        )
        .map_err(StorageError::Write)?;

        tracing::debug!("cached '{}' -> {}", key, location.to_field());
        Ok(())
    }
}
