mod dashmap_resolution_cache;
mod http_lookup_service;
mod sqlite_resolution_cache;

pub use dashmap_resolution_cache::DashMapResolutionCache;
pub use http_lookup_service::{HttpLookupConfig, HttpLookupService, DEFAULT_API_URL};
pub use sqlite_resolution_cache::SqliteResolutionCache;
