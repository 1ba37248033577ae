use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_FRESHNESS_MINUTES: i64 = 10;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// Time-bounded cache of one listing per user
///
/// One row per user key; writing overwrites, and a row older than the
/// freshness window is simply ignored on read. There is no other eviction.
pub struct ListingCache {
    conn: Mutex<Connection>,
    freshness: Duration,
}

impl ListingCache {
    pub fn open(db_path: impl AsRef<Path>, freshness: Duration) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            freshness,
        })
    }

    pub fn in_memory(freshness: Duration) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            freshness,
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS user_listings (
                user_key TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                cached_at INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    pub fn freshness(&self) -> Duration {
        self.freshness
    }

    /// Store `value` for `user_key`, stamped with `now`
    pub fn put_at<T: Serialize>(&self, user_key: &str, value: &T, now: DateTime<Utc>) -> Result<()> {
        let data = serde_json::to_string(value)?;
        let conn = self.conn.lock().map_err(|_| CacheError::Poisoned)?;
        conn.execute(
            "INSERT OR REPLACE INTO user_listings (user_key, data, cached_at) VALUES (?1, ?2, ?3)",
            params![user_key, data, now.timestamp_millis()],
        )?;
        debug!("Cached listing for {}", user_key);
        Ok(())
    }

    /// Cached value for `user_key` if it is younger than the freshness window at `now`
    pub fn get_fresh_at<T: DeserializeOwned>(&self, user_key: &str, now: DateTime<Utc>) -> Result<Option<T>> {
        let row: Option<(String, i64)> = {
            let conn = self.conn.lock().map_err(|_| CacheError::Poisoned)?;
            conn.query_row(
                "SELECT data, cached_at FROM user_listings WHERE user_key = ?1",
                params![user_key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
        };

        let Some((data, cached_at)) = row else {
            debug!("Cache miss for {}", user_key);
            return Ok(None);
        };

        let age = Duration::milliseconds(now.timestamp_millis() - cached_at);
        if age >= self.freshness {
            debug!("Cache entry for {} is stale ({}s old)", user_key, age.num_seconds());
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&data)?))
    }

    pub fn put<T: Serialize>(&self, user_key: &str, value: &T) -> Result<()> {
        self.put_at(user_key, value, Utc::now())
    }

    pub fn get_fresh<T: DeserializeOwned>(&self, user_key: &str) -> Result<Option<T>> {
        self.get_fresh_at(user_key, Utc::now())
    }

    pub fn invalidate(&self, user_key: &str) -> Result<()> {
        let conn = self.conn.lock().map_err(|_| CacheError::Poisoned)?;
        conn.execute("DELETE FROM user_listings WHERE user_key = ?1", params![user_key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cache() -> ListingCache {
        ListingCache::in_memory(Duration::minutes(DEFAULT_FRESHNESS_MINUTES)).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_fresh_read_within_window() {
        let cache = cache();
        cache.put_at("octocat", &vec!["a", "b"], t0()).unwrap();

        let hit: Option<Vec<String>> = cache.get_fresh_at("octocat", t0() + Duration::minutes(9)).unwrap();
        assert_eq!(hit, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_stale_read_after_window() {
        let cache = cache();
        cache.put_at("octocat", &vec![1, 2, 3], t0()).unwrap();

        let miss: Option<Vec<u32>> = cache.get_fresh_at("octocat", t0() + Duration::minutes(11)).unwrap();
        assert!(miss.is_none());
    }

    #[test]
    fn test_exact_window_boundary_is_stale() {
        let cache = cache();
        cache.put_at("octocat", &1u32, t0()).unwrap();

        let miss: Option<u32> = cache.get_fresh_at("octocat", t0() + Duration::minutes(10)).unwrap();
        assert!(miss.is_none());
    }

    #[test]
    fn test_overwrite_refreshes_timestamp() {
        let cache = cache();
        cache.put_at("octocat", &1u32, t0()).unwrap();
        cache.put_at("octocat", &2u32, t0() + Duration::minutes(8)).unwrap();

        let hit: Option<u32> = cache.get_fresh_at("octocat", t0() + Duration::minutes(15)).unwrap();
        assert_eq!(hit, Some(2));
    }

    #[test]
    fn test_users_do_not_share_entries() {
        let cache = cache();
        cache.put_at("alice", &"alice-repos", t0()).unwrap();

        let other: Option<String> = cache.get_fresh_at("bob", t0()).unwrap();
        assert!(other.is_none());
    }

    #[test]
    fn test_invalidate() {
        let cache = cache();
        cache.put_at("alice", &1u32, t0()).unwrap();
        cache.invalidate("alice").unwrap();

        let gone: Option<u32> = cache.get_fresh_at("alice", t0()).unwrap();
        assert!(gone.is_none());
    }

    #[test]
    fn test_file_backed_cache_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");

        {
            let cache = ListingCache::open(&path, Duration::minutes(10)).unwrap();
            cache.put_at("alice", &42u32, t0()).unwrap();
        }

        let cache = ListingCache::open(&path, Duration::minutes(10)).unwrap();
        let hit: Option<u32> = cache.get_fresh_at("alice", t0() + Duration::minutes(1)).unwrap();
        assert_eq!(hit, Some(42));
    }
}
