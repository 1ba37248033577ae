use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use gitlink_api::{BackendError, Filter, GitHubError, SearchRequest};
use gitlink_core::{
    submissions::SubmissionDraft, ControllerSettings, Difficulty, HomeController, Language, Owner,
    RankingProfile, RecordStore, RepositoryListing, ReviewStatus, SearchFilters, SearchPage,
    SearchProvider, SubmissionService, ToggleStatus, UserProfile, View,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Backend tables kept in memory, filtered the way PostgREST filters
#[derive(Default)]
struct InMemoryStore {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    fail_writes: AtomicBool,
    /// Inserts for this repository id fail, after a short delay
    slow_failure: Mutex<Option<u64>>,
    inserts: AtomicUsize,
}

impl InMemoryStore {
    fn rows(&self, table: &str) -> Vec<Value> {
        self.tables.lock().unwrap().get(table).cloned().unwrap_or_default()
    }

    fn seed(&self, table: &str, row: Value) {
        self.tables.lock().unwrap().entry(table.to_string()).or_default().push(row);
    }
}

fn matches(row: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|f| match row.get(&f.column) {
        Some(Value::String(s)) => *s == f.value,
        Some(other) => other.to_string() == f.value,
        None => false,
    })
}

#[async_trait]
impl RecordStore for InMemoryStore {
    fn is_configured(&self) -> bool {
        true
    }

    async fn select(&self, table: &str, columns: &str, filters: &[Filter]) -> Result<Vec<Value>, BackendError> {
        let picked = self
            .rows(table)
            .into_iter()
            .filter(|row| matches(row, filters))
            .map(|row| {
                if columns == "*" {
                    return row;
                }
                let projected: serde_json::Map<String, Value> = columns
                    .split(',')
                    .map(|c| (c.to_string(), row.get(c).cloned().unwrap_or(Value::Null)))
                    .collect();
                Value::Object(projected)
            })
            .collect();
        Ok(picked)
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<(), BackendError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BackendError::RemoteError("503: backend unavailable".into()));
        }
        let doomed = *self.slow_failure.lock().unwrap();
        if let Some(id) = doomed {
            if rows.iter().any(|row| row["repository_id"] == id) {
                tokio::time::sleep(Duration::from_millis(50)).await;
                return Err(BackendError::RemoteError("504: gateway timeout".into()));
            }
        }
        self.inserts.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables.lock().unwrap();
        tables.entry(table.to_string()).or_default().extend(rows);
        Ok(())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), BackendError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BackendError::RemoteError("503: backend unavailable".into()));
        }
        let mut tables = self.tables.lock().unwrap();
        if let Some(rows) = tables.get_mut(table) {
            rows.retain(|row| !matches(row, filters));
        }
        Ok(())
    }
}

/// Canned GitHub: every query returns the same page unless it matches `failing`
struct FakeGitHub {
    page: Vec<RepositoryListing>,
    failing: Option<&'static str>,
    calls: AtomicUsize,
}

impl FakeGitHub {
    fn new(page: Vec<RepositoryListing>) -> Self {
        Self {
            page,
            failing: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SearchProvider for FakeGitHub {
    async fn search(&self, request: &SearchRequest) -> gitlink_core::Result<SearchPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(marker) = self.failing {
            if request.query.contains(marker) {
                return Err(GitHubError::ApiError {
                    status: 422,
                    reason: "Unprocessable Entity".into(),
                }
                .into());
            }
        }
        Ok(SearchPage {
            items: self.page.clone(),
            total_count: self.page.len() as u64,
        })
    }

    async fn user_repositories(&self, _login: &str) -> gitlink_core::Result<Vec<RepositoryListing>> {
        Ok(self.page.clone())
    }

    async fn user_avatar(&self, login: &str) -> gitlink_core::Result<Option<String>> {
        Ok(Some(format!("https://avatars.example/{}", login)))
    }
}

fn create_test_repo(id: u64, stars: u32) -> RepositoryListing {
    let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    RepositoryListing {
        id,
        name: format!("repo-{}", id),
        full_name: format!("octo/repo-{}", id),
        owner: Owner {
            login: "octo".into(),
            avatar_url: "https://avatars.example/octo".into(),
        },
        description: Some(format!("Repository number {}", id)),
        language: Some("Rust".into()),
        topics: vec!["learning".into()],
        stars,
        forks: 1,
        open_issues: 0,
        has_issues: true,
        created_at: at,
        updated_at: at,
        url: format!("https://github.com/octo/repo-{}", id),
    }
}

fn quiet_settings() -> ControllerSettings {
    ControllerSettings {
        trending: RankingProfile::trending().without_delay(),
        educational: RankingProfile::educational().without_delay(),
        ..Default::default()
    }
}

fn signed_in() -> UserProfile {
    UserProfile {
        id: "user-1".into(),
        login: "octo".into(),
        name: "Octo".into(),
        avatar_url: String::new(),
        email: None,
    }
}

#[tokio::test]
async fn test_refresh_home_fills_both_listings() {
    let page: Vec<_> = (1..=30).map(|i| create_test_repo(i, i as u32)).collect();
    let github = Arc::new(FakeGitHub::new(page));
    let controller = HomeController::new(github.clone(), Arc::new(InMemoryStore::default()), quiet_settings());

    controller.refresh_home().await;
    let state = controller.snapshot().await;

    assert_eq!(github.calls.load(Ordering::SeqCst), 5 + 15);
    assert_eq!(state.trending.len(), 12);
    assert_eq!(state.educational.len(), 20);
    // same timestamps everywhere, so stars decide
    assert_eq!(state.trending[0].id, 30);
    assert_eq!(state.educational[0].id, 30);
    assert!(state.api_error.is_none());
}

#[tokio::test]
async fn test_one_failing_trending_query_keeps_the_rest() {
    let github = FakeGitHub {
        failing: Some("created:>="),
        ..FakeGitHub::new(vec![create_test_repo(1, 10)])
    };
    let controller = HomeController::new(Arc::new(github), Arc::new(InMemoryStore::default()), quiet_settings());

    controller.load_trending_with(&Language::Tag("rust".into())).await;
    let state = controller.snapshot().await;

    assert_eq!(state.trending.len(), 1);
    assert!(state.api_error.is_none());
}

#[tokio::test]
async fn test_bookmark_round_trip_and_rollback() {
    let store = Arc::new(InMemoryStore::default());
    let controller = HomeController::new(
        Arc::new(FakeGitHub::new(vec![])),
        store.clone(),
        quiet_settings(),
    );
    controller.set_user(Some(signed_in())).await;

    let repo = create_test_repo(7, 70);
    assert_eq!(controller.toggle_bookmark(&repo).await, ToggleStatus::Added);
    assert_eq!(store.rows("bookmarks").len(), 1);
    assert_eq!(store.rows("bookmarks")[0]["repository_data"]["stargazers_count"], 70);

    // a fresh controller sees the stored snapshot
    let reloaded = HomeController::new(Arc::new(FakeGitHub::new(vec![])), store.clone(), quiet_settings());
    reloaded.set_user(Some(signed_in())).await;
    assert!(reloaded.snapshot().await.is_bookmarked(7));

    store.fail_writes.store(true, Ordering::SeqCst);
    assert_eq!(controller.toggle_bookmark(&repo).await, ToggleStatus::RolledBack);
    assert!(controller.snapshot().await.is_bookmarked(7));

    store.fail_writes.store(false, Ordering::SeqCst);
    assert_eq!(controller.toggle_bookmark(&repo).await, ToggleStatus::Removed);
    assert!(store.rows("bookmarks").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_toggles_roll_back_only_their_own_change() {
    let store = Arc::new(InMemoryStore::default());
    *store.slow_failure.lock().unwrap() = Some(1);
    let controller = HomeController::new(Arc::new(FakeGitHub::new(vec![])), store.clone(), quiet_settings());
    controller.set_user(Some(signed_in())).await;

    let repo_a = create_test_repo(1, 10);
    let repo_b = create_test_repo(2, 20);
    let (first, second) = tokio::join!(
        controller.toggle_bookmark(&repo_a),
        controller.toggle_bookmark(&repo_b),
    );
    assert_eq!(first, ToggleStatus::RolledBack);
    assert_eq!(second, ToggleStatus::Added);

    let state = controller.snapshot().await;
    assert!(state.is_bookmarked(2));
    assert!(!state.is_bookmarked(1));
    assert_eq!(store.rows("bookmarks").len(), 1);
}

#[tokio::test]
async fn test_duplicate_submission_rejected_before_insert() {
    let store = Arc::new(InMemoryStore::default());
    store.seed(
        "submitted_repos",
        json!({
            "id": "existing",
            "github_url": "https://github.com/octo/repo-1",
            "description": "first",
            "submitted_by": "someone",
            "status": "approved"
        }),
    );

    let service = SubmissionService::new(store.clone(), Arc::new(FakeGitHub::new(vec![])));
    let draft = SubmissionDraft {
        github_url: "https://github.com/octo/repo-1".into(),
        description: "again".into(),
        tech_stack: vec!["rust".into()],
        difficulty: Difficulty::Beginner,
    };

    let err = service.submit(draft.clone(), Some(&signed_in())).await.unwrap_err();
    assert!(err.is_constraint_violation());

    for link in ["https://github.com/octo/repo-1/", "https://github.com/Octo/Repo-1.git"] {
        let variant = SubmissionDraft {
            github_url: link.into(),
            ..draft.clone()
        };
        let err = service.submit(variant, Some(&signed_in())).await.unwrap_err();
        assert!(err.is_constraint_violation());
    }
    assert_eq!(store.inserts.load(Ordering::SeqCst), 0);
    assert_eq!(store.rows("submitted_repos").len(), 1);
}

#[tokio::test]
async fn test_submit_list_and_delete_own_submission() {
    let store = Arc::new(InMemoryStore::default());
    let service = SubmissionService::new(store.clone(), Arc::new(FakeGitHub::new(vec![])));

    let uploaded = service
        .upload_own(&create_test_repo(3, 5), &signed_in())
        .await
        .unwrap();
    assert_eq!(uploaded.submitted_by.as_deref(), Some("octo"));
    assert_eq!(uploaded.owner_avatar.as_deref(), Some("https://avatars.example/octo"));
    assert_eq!(uploaded.tech_stack, vec!["learning".to_string()]);

    let pending = service.list(Some(ReviewStatus::Pending)).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert!(service.list(Some(ReviewStatus::Approved)).await.unwrap().is_empty());

    // the in-memory backend has no id column default, so give the row one
    let mut stored = pending[0].clone();
    stored.id = Some("row-1".into());
    store.tables.lock().unwrap().get_mut("submitted_repos").unwrap()[0]["id"] = json!("row-1");

    let stranger = UserProfile {
        login: "mallory".into(),
        ..signed_in()
    };
    assert!(service.delete(&stored, &stranger).await.is_err());
    service.delete(&stored, &signed_in()).await.unwrap();
    assert!(store.rows("submitted_repos").is_empty());
}

#[tokio::test]
async fn test_view_changes_and_search_state() {
    let controller = HomeController::new(
        Arc::new(FakeGitHub::new(vec![create_test_repo(1, 1)])),
        Arc::new(InMemoryStore::default()),
        quiet_settings(),
    );

    controller.set_view(View::Bookmarks).await;
    assert_eq!(controller.snapshot().await.view, View::Bookmarks);

    controller.search(SearchFilters::default()).await;
    let state = controller.snapshot().await;
    assert!(state.has_searched);
    assert_eq!(state.search_results.len(), 1);

    controller.clear_search().await;
    let state = controller.snapshot().await;
    assert!(!state.has_searched);
    assert!(state.search_results.is_empty());
    assert_eq!(state.view, View::Bookmarks);
}
