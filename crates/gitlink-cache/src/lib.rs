// SQLite-backed cache for per-user listings
// Keeps the expensive "my repositories" call down to one per freshness window

pub mod cache;

pub use cache::{CacheError, ListingCache, DEFAULT_FRESHNESS_MINUTES};
