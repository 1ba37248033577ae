use gitlink_api::SearchRequest;

use crate::{models::RepositoryListing, Result};

/// One page of search results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    pub items: Vec<RepositoryListing>,
    pub total_count: u64,
}

/// Where listings come from. The aggregator and controller only see this trait,
/// so tests can swap in a mock instead of hitting GitHub.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage>;

    /// Public repositories of `login`, most recently updated first
    async fn user_repositories(&self, login: &str) -> Result<Vec<RepositoryListing>>;

    async fn user_avatar(&self, login: &str) -> Result<Option<String>>;
}
