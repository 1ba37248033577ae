// View state controller - the one place that mutates what the front end shows
use chrono::{DateTime, Utc};
use gitlink_api::{with_retry, RetryConfig, SearchRequest};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    aggregate::{aggregate, Aggregation, RankingProfile},
    auth::UserProfile,
    bookmarks::{BookmarkService, ToggleState, ToggleStatus},
    config::Config,
    models::{Language, RepositoryListing, SearchFilters},
    query::{QueryBuilder, StarBand},
    search::SearchProvider,
    store::RecordStore,
    Error,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Home,
    Ideas,
    Submit,
    Upload,
    Bookmarks,
}

/// Everything the front end renders
#[derive(Debug, Clone, Default, Serialize)]
pub struct ViewState {
    pub view: View,
    pub filters: SearchFilters,
    pub user: Option<UserProfile>,
    pub trending: Vec<RepositoryListing>,
    pub educational: Vec<RepositoryListing>,
    pub search_results: Vec<RepositoryListing>,
    pub total_count: u64,
    pub bookmarks: Vec<RepositoryListing>,
    pub trending_loading: bool,
    pub educational_loading: bool,
    pub search_loading: bool,
    /// A search is active; auto-refresh stays quiet while this is set
    pub has_searched: bool,
    /// Rate-limit banner text
    pub api_error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    pub bookmark_status: Option<ToggleStatus>,
}

impl ViewState {
    pub fn is_bookmarked(&self, id: u64) -> bool {
        self.bookmarks.iter().any(|b| b.id == id)
    }
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub trending: RankingProfile,
    pub educational: RankingProfile,
    pub beginner_band: StarBand,
    pub search_per_page: u32,
    /// Applied to plain searches only, and only to transient failures
    pub search_retry: RetryConfig,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            trending: RankingProfile::trending(),
            educational: RankingProfile::educational(),
            beginner_band: StarBand::default(),
            search_per_page: 30,
            search_retry: RetryConfig::none(),
        }
    }
}

impl ControllerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            trending: config.ranking.trending,
            educational: config.ranking.educational,
            beginner_band: config.beginner,
            ..Self::default()
        }
    }
}

struct Inner {
    provider: Arc<dyn SearchProvider>,
    bookmarks: BookmarkService,
    queries: QueryBuilder,
    settings: ControllerSettings,
    state: RwLock<ViewState>,
}

/// Cheap to clone; every clone drives the same state
#[derive(Clone)]
pub struct HomeController {
    inner: Arc<Inner>,
}

impl HomeController {
    pub fn new(provider: Arc<dyn SearchProvider>, store: Arc<dyn RecordStore>, settings: ControllerSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                provider,
                bookmarks: BookmarkService::new(store),
                queries: QueryBuilder::new(settings.beginner_band),
                settings,
                state: RwLock::new(ViewState::default()),
            }),
        }
    }

    pub async fn snapshot(&self) -> ViewState {
        self.inner.state.read().await.clone()
    }

    pub async fn load_trending(&self) {
        self.load_trending_with(&Language::All).await
    }

    pub async fn load_trending_with(&self, language: &Language) {
        {
            let mut state = self.inner.state.write().await;
            state.trending_loading = true;
            state.api_error = None;
        }

        let queries = self.inner.queries.trending_queries(language, Utc::now());
        let result = aggregate(self.inner.provider.as_ref(), &queries, &self.inner.settings.trending).await;

        let mut state = self.inner.state.write().await;
        state.trending_loading = false;
        note_failures(&mut state, &result, "trending");
        state.trending = result.listings;
        state.last_updated = Some(Utc::now());
    }

    pub async fn load_educational(&self) {
        {
            let mut state = self.inner.state.write().await;
            state.educational_loading = true;
            state.api_error = None;
        }

        let queries = self.inner.queries.educational_queries(Utc::now());
        let result = aggregate(self.inner.provider.as_ref(), &queries, &self.inner.settings.educational).await;

        let mut state = self.inner.state.write().await;
        state.educational_loading = false;
        note_failures(&mut state, &result, "educational");
        state.educational = result.listings;
        state.last_updated = Some(Utc::now());
    }

    /// Both home listings, concurrently
    pub async fn refresh_home(&self) {
        futures::future::join(self.load_trending(), self.load_educational()).await;
        info!("Home listings refreshed");
    }

    pub async fn search(&self, filters: SearchFilters) {
        let per_page = self.inner.settings.search_per_page;
        self.search_page(filters, 1, per_page).await
    }

    /// Run one plain search. Failures leave an empty result; only a rate
    /// limit shows up as the banner.
    pub async fn search_page(&self, filters: SearchFilters, page: u32, per_page: u32) {
        {
            let mut state = self.inner.state.write().await;
            state.search_loading = true;
            state.has_searched = true;
            state.api_error = None;
            state.filters = filters.clone();
        }

        let request = SearchRequest::new(self.inner.queries.search_query(&filters))
            .sort(filters.sort.as_str(), filters.order.as_str())
            .page(page)
            .per_page(per_page);

        let provider = &self.inner.provider;
        let outcome = with_retry(&self.inner.settings.search_retry, Error::is_transient, || {
            provider.search(&request)
        })
        .await;

        let mut state = self.inner.state.write().await;
        state.search_loading = false;
        match outcome {
            Ok(page) => {
                debug!("Search returned {} of {}", page.items.len(), page.total_count);
                state.search_results = page.items;
                state.total_count = page.total_count;
            }
            Err(e) => {
                warn!("Search failed: {}", e);
                if e.is_rate_limited() {
                    state.api_error = Some(e.to_string());
                }
                state.search_results.clear();
                state.total_count = 0;
            }
        }
    }

    pub async fn clear_search(&self) {
        let mut state = self.inner.state.write().await;
        state.has_searched = false;
        state.search_results.clear();
        state.total_count = 0;
        state.filters = SearchFilters::default();
    }

    pub async fn set_view(&self, view: View) {
        self.inner.state.write().await.view = view;
    }

    /// Sign-in state changed: reload bookmarks for the new user, drop them on sign-out
    pub async fn set_user(&self, user: Option<UserProfile>) {
        let signed_in = user.is_some();
        {
            let mut state = self.inner.state.write().await;
            state.user = user;
            state.bookmarks.clear();
            state.bookmark_status = None;
        }
        if signed_in {
            self.load_bookmarks().await;
        }
    }

    pub async fn load_bookmarks(&self) {
        let Some(user_id) = self.current_user_id().await else {
            return;
        };
        if !self.inner.bookmarks.is_available() {
            debug!("Bookmarks disabled: backend not configured");
            return;
        }

        match self.inner.bookmarks.list(&user_id).await {
            Ok(bookmarks) => self.inner.state.write().await.bookmarks = bookmarks,
            Err(e) => warn!("Loading bookmarks failed: {}", e),
        }
    }

    /// Optimistic add/remove; the visible list is restored if the write fails
    pub async fn toggle_bookmark(&self, listing: &RepositoryListing) -> ToggleStatus {
        let Some(user_id) = self.current_user_id().await else {
            return ToggleStatus::Unavailable;
        };
        if !self.inner.bookmarks.is_available() {
            return ToggleStatus::Unavailable;
        }

        let pending = {
            let mut state = self.inner.state.write().await;
            let pending = ToggleState::begin(&state.bookmarks, listing);
            pending.apply_to(&mut state.bookmarks);
            state.bookmark_status = Some(pending.status());
            pending
        };

        let settled = self.inner.bookmarks.commit(&user_id, pending).await;

        let mut state = self.inner.state.write().await;
        settled.apply_to(&mut state.bookmarks);
        let status = settled.status();
        state.bookmark_status = Some(status);
        status
    }

    /// Refresh the home listings every `period` while the home view is up
    /// and no search is active. Stops when the handle is dropped.
    pub fn start_auto_refresh(&self, period: Duration) -> AutoRefresh {
        let controller = self.clone();
        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);
            loop {
                ticker.tick().await;
                let idle_home = {
                    let state = controller.inner.state.read().await;
                    state.view == View::Home && !state.has_searched
                };
                if idle_home {
                    debug!("Auto-refresh tick");
                    controller.refresh_home().await;
                } else {
                    debug!("Auto-refresh skipped");
                }
            }
        });
        AutoRefresh { handle }
    }

    async fn current_user_id(&self) -> Option<String> {
        self.inner.state.read().await.user.as_ref().map(|u| u.id.clone())
    }
}

fn note_failures(state: &mut ViewState, result: &Aggregation, label: &str) {
    if result.all_failed() {
        if let Some(e) = result.last_error() {
            warn!("Every {} query failed, last error: {}", label, e);
        }
    }
    if let Some(e) = result.rate_limit_error() {
        state.api_error = Some(e.to_string());
    }
}

/// Handle to the auto-refresh task
pub struct AutoRefresh {
    handle: JoinHandle<()>,
}

impl AutoRefresh {
    pub fn cancel(self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for AutoRefresh {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
