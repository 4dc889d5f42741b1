mod lookup_service;
mod progress;
mod resolution_cache;

pub use lookup_service::LookupService;
pub use progress::{BatchObserver, NoopObserver, RowProgress};
pub use resolution_cache::ResolutionCache;
