// Batch-query-merge-rank pipeline behind the trending and educational listings
use gitlink_api::SearchRequest;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{models::RepositoryListing, search::SearchProvider, Error};

/// Knobs for one aggregation flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingProfile {
    /// Milliseconds of recency one star is worth
    pub star_weight: i64,
    /// Maximum listings kept after ranking
    pub limit: usize,
    /// Items requested per query
    pub per_query: u32,
    /// Pause between successive queries
    pub delay_ms: u64,
}

impl RankingProfile {
    pub fn trending() -> Self {
        Self {
            star_weight: 1000,
            limit: 12,
            per_query: 10,
            delay_ms: 100,
        }
    }

    pub fn educational() -> Self {
        Self {
            star_weight: 100,
            limit: 20,
            per_query: 8,
            delay_ms: 150,
        }
    }

    /// Same ranking, no courtesy pauses
    pub fn without_delay(self) -> Self {
        Self { delay_ms: 0, ..self }
    }
}

#[derive(Debug)]
pub struct QueryFailure {
    pub query: String,
    pub error: Error,
}

/// Ranked listings plus whatever went wrong along the way
#[derive(Debug, Default)]
pub struct Aggregation {
    pub listings: Vec<RepositoryListing>,
    pub failures: Vec<QueryFailure>,
    pub queries_run: usize,
}

impl Aggregation {
    pub fn all_failed(&self) -> bool {
        self.queries_run > 0 && self.failures.len() == self.queries_run
    }

    /// Error of the last query that failed
    pub fn last_error(&self) -> Option<&Error> {
        self.failures.last().map(|f| &f.error)
    }

    pub fn rate_limit_error(&self) -> Option<&Error> {
        self.failures.iter().map(|f| &f.error).find(|e| e.is_rate_limited())
    }
}

/// Issue `queries` one after another, then merge, dedupe and rank.
///
/// A failing query is logged and recorded; the rest still run.
pub async fn aggregate(provider: &dyn SearchProvider, queries: &[String], profile: &RankingProfile) -> Aggregation {
    let mut collected = Vec::new();
    let mut failures = Vec::new();

    for (i, query) in queries.iter().enumerate() {
        if i > 0 && profile.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(profile.delay_ms)).await;
        }

        let request = SearchRequest::new(query.as_str())
            .sort("updated", "desc")
            .per_page(profile.per_query);

        match provider.search(&request).await {
            Ok(page) => {
                debug!("Query {}/{} returned {} items", i + 1, queries.len(), page.items.len());
                collected.extend(page.items);
            }
            Err(error) => {
                warn!("Query failed: {:?}: {}", query, error);
                failures.push(QueryFailure {
                    query: query.clone(),
                    error,
                });
            }
        }
    }

    let listings = rank(collected, profile.star_weight, profile.limit);
    info!(
        "Aggregated {} listings from {} queries ({} failed)",
        listings.len(),
        queries.len(),
        failures.len()
    );

    Aggregation {
        listings,
        failures,
        queries_run: queries.len(),
    }
}

/// Recency plus weighted popularity
pub fn score(listing: &RepositoryListing, star_weight: i64) -> i64 {
    listing
        .updated_at
        .timestamp_millis()
        .saturating_add((listing.stars as i64).saturating_mul(star_weight))
}

/// Dedupe by id (first seen wins), sort by score descending, keep `limit`
pub fn rank(listings: Vec<RepositoryListing>, star_weight: i64, limit: usize) -> Vec<RepositoryListing> {
    let mut seen = HashSet::new();
    let mut unique: Vec<RepositoryListing> = listings.into_iter().filter(|l| seen.insert(l.id)).collect();

    // stable, so ties keep arrival order
    unique.sort_by_key(|l| std::cmp::Reverse(score(l, star_weight)));
    unique.truncate(limit);
    unique
}
