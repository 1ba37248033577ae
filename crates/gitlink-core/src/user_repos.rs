// The signed-in user's own repositories, read through the local cache
use chrono::{DateTime, Utc};
use gitlink_cache::ListingCache;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{models::RepositoryListing, search::SearchProvider, Result};

pub struct UserRepositories {
    provider: Arc<dyn SearchProvider>,
    cache: Arc<ListingCache>,
}

/// Where a listing came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cache,
    Remote,
}

impl UserRepositories {
    pub fn new(provider: Arc<dyn SearchProvider>, cache: Arc<ListingCache>) -> Self {
        Self { provider, cache }
    }

    pub async fn load(&self, login: &str) -> Result<(Vec<RepositoryListing>, Source)> {
        self.load_at(login, Utc::now()).await
    }

    /// Fresh cache hit returns straight away, anything else goes to GitHub
    /// and refreshes the cache. A broken cache never blocks the fetch.
    pub async fn load_at(&self, login: &str, now: DateTime<Utc>) -> Result<(Vec<RepositoryListing>, Source)> {
        match self.cache.get_fresh_at::<Vec<RepositoryListing>>(login, now) {
            Ok(Some(repos)) => {
                debug!("Using cached repositories for {}", login);
                return Ok((repos, Source::Cache));
            }
            Ok(None) => {}
            Err(e) => warn!("Cache read failed for {}: {}", login, e),
        }

        let repos = self.provider.user_repositories(login).await?;
        if let Err(e) = self.cache.put_at(login, &repos, now) {
            warn!("Cache write failed for {}: {}", login, e);
        }
        Ok((repos, Source::Remote))
    }

    /// Drop the cached copy, e.g. after the user published something new
    pub fn invalidate(&self, login: &str) -> Result<()> {
        Ok(self.cache.invalidate(login)?)
    }
}
