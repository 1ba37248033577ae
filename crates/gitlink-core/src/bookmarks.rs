// Bookmarks table plus the optimistic toggle used by the controller
use gitlink_api::Filter;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    models::{Bookmark, RepositoryListing},
    store::RecordStore,
    Result,
};

const TABLE: &str = "bookmarks";

pub struct BookmarkService {
    store: Arc<dyn RecordStore>,
}

impl BookmarkService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn is_available(&self) -> bool {
        self.store.is_configured()
    }

    /// Bookmarked listing snapshots of `user_id`
    pub async fn list(&self, user_id: &str) -> Result<Vec<RepositoryListing>> {
        let rows = self
            .store
            .select(TABLE, "repository_data", &[Filter::eq("user_id", user_id)])
            .await?;

        let mut listings = Vec::with_capacity(rows.len());
        for mut row in rows {
            let data = row
                .get_mut("repository_data")
                .map(serde_json::Value::take)
                .unwrap_or_default();
            match serde_json::from_value::<RepositoryListing>(data) {
                Ok(listing) => listings.push(listing),
                Err(e) => warn!("Skipping unreadable bookmark for {}: {}", user_id, e),
            }
        }

        debug!("Loaded {} bookmarks for {}", listings.len(), user_id);
        Ok(listings)
    }

    pub async fn add(&self, user_id: &str, listing: &RepositoryListing) -> Result<()> {
        let row = Bookmark {
            user_id: user_id.to_string(),
            repository_id: listing.id,
            repository_data: listing.clone(),
        };
        self.store.insert(TABLE, vec![serde_json::to_value(row)?]).await?;
        Ok(())
    }

    pub async fn remove(&self, user_id: &str, repository_id: u64) -> Result<()> {
        self.store
            .delete(
                TABLE,
                &[
                    Filter::eq("user_id", user_id),
                    Filter::eq("repository_id", repository_id),
                ],
            )
            .await?;
        Ok(())
    }

    /// Full toggle round: optimistic change, remote write, rollback on failure
    pub async fn toggle(&self, user_id: &str, current: &[RepositoryListing], listing: &RepositoryListing) -> ToggleState {
        self.commit(user_id, ToggleState::begin(current, listing)).await
    }

    /// Perform the remote write for a pending toggle and settle it
    pub async fn commit(&self, user_id: &str, state: ToggleState) -> ToggleState {
        let outcome = match state.action() {
            Some(ToggleAction::Add(listing)) => self.add(user_id, listing).await,
            Some(ToggleAction::Remove(listing)) => self.remove(user_id, listing.id).await,
            None => Ok(()),
        };
        state.settle(outcome)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToggleAction {
    Add(RepositoryListing),
    Remove(RepositoryListing),
}

impl ToggleAction {
    pub fn listing(&self) -> &RepositoryListing {
        match self {
            ToggleAction::Add(listing) | ToggleAction::Remove(listing) => listing,
        }
    }
}

/// `Idle -> Pending -> Committed | RolledBack`
#[derive(Debug, Clone, PartialEq)]
pub enum ToggleState {
    Idle,
    Pending {
        action: ToggleAction,
        previous: Vec<RepositoryListing>,
        optimistic: Vec<RepositoryListing>,
    },
    Committed {
        action: ToggleAction,
        bookmarks: Vec<RepositoryListing>,
    },
    RolledBack {
        action: ToggleAction,
        restored: Vec<RepositoryListing>,
        error: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleStatus {
    Idle,
    Pending,
    Added,
    Removed,
    RolledBack,
    /// No signed-in user or no backend
    Unavailable,
}

impl ToggleState {
    /// Remove when already bookmarked, add otherwise
    pub fn begin(current: &[RepositoryListing], listing: &RepositoryListing) -> Self {
        let previous = current.to_vec();
        let (action, optimistic) = if current.iter().any(|l| l.id == listing.id) {
            let kept = current.iter().filter(|l| l.id != listing.id).cloned().collect();
            (ToggleAction::Remove(listing.clone()), kept)
        } else {
            let mut grown = previous.clone();
            grown.push(listing.clone());
            (ToggleAction::Add(listing.clone()), grown)
        };

        ToggleState::Pending {
            action,
            previous,
            optimistic,
        }
    }

    pub fn action(&self) -> Option<&ToggleAction> {
        match self {
            ToggleState::Pending { action, .. }
            | ToggleState::Committed { action, .. }
            | ToggleState::RolledBack { action, .. } => Some(action),
            ToggleState::Idle => None,
        }
    }

    /// The list to show right now
    pub fn visible(&self) -> Option<&[RepositoryListing]> {
        match self {
            ToggleState::Idle => None,
            ToggleState::Pending { optimistic, .. } => Some(optimistic),
            ToggleState::Committed { bookmarks, .. } => Some(bookmarks),
            ToggleState::RolledBack { restored, .. } => Some(restored),
        }
    }

    /// Resolve a pending toggle with the outcome of the remote write
    pub fn settle(self, outcome: Result<()>) -> Self {
        match self {
            ToggleState::Pending {
                action,
                previous,
                optimistic,
            } => match outcome {
                Ok(()) => ToggleState::Committed {
                    action,
                    bookmarks: optimistic,
                },
                Err(e) => {
                    warn!("Bookmark change rolled back: {}", e);
                    ToggleState::RolledBack {
                        action,
                        restored: previous,
                        error: e.to_string(),
                    }
                }
            },
            other => other,
        }
    }

    /// Apply only this toggle's change to `current`. Other toggles may have
    /// changed the list since `begin`, so the snapshots are not copied back.
    pub fn apply_to(&self, current: &mut Vec<RepositoryListing>) {
        let (listing, present) = match self {
            ToggleState::Idle => return,
            ToggleState::Pending { action, .. } | ToggleState::Committed { action, .. } => {
                (action.listing(), matches!(action, ToggleAction::Add(_)))
            }
            ToggleState::RolledBack { action, .. } => (action.listing(), matches!(action, ToggleAction::Remove(_))),
        };

        let listed = current.iter().any(|l| l.id == listing.id);
        if present && !listed {
            current.push(listing.clone());
        } else if !present && listed {
            current.retain(|l| l.id != listing.id);
        }
    }

    pub fn status(&self) -> ToggleStatus {
        match self {
            ToggleState::Idle => ToggleStatus::Idle,
            ToggleState::Pending { .. } => ToggleStatus::Pending,
            ToggleState::Committed {
                action: ToggleAction::Add(_),
                ..
            } => ToggleStatus::Added,
            ToggleState::Committed {
                action: ToggleAction::Remove(_),
                ..
            } => ToggleStatus::Removed,
            ToggleState::RolledBack { .. } => ToggleStatus::RolledBack,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Owner;
    use crate::store::MockRecordStore;
    use chrono::{TimeZone, Utc};
    use gitlink_api::BackendError;

    fn listing(id: u64) -> RepositoryListing {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        RepositoryListing {
            id,
            name: format!("r{}", id),
            full_name: format!("o/r{}", id),
            owner: Owner {
                login: "o".into(),
                avatar_url: String::new(),
            },
            description: None,
            language: None,
            topics: vec![],
            stars: 1,
            forks: 0,
            open_issues: 0,
            has_issues: false,
            created_at: at,
            updated_at: at,
            url: format!("https://github.com/o/r{}", id),
        }
    }

    #[test]
    fn test_begin_add_is_optimistic() {
        let state = ToggleState::begin(&[listing(1)], &listing(2));
        assert_eq!(state.status(), ToggleStatus::Pending);
        let ids: Vec<u64> = state.visible().unwrap().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_begin_remove_when_present() {
        let state = ToggleState::begin(&[listing(1), listing(2)], &listing(1));
        assert_eq!(state.action(), Some(&ToggleAction::Remove(listing(1))));
        assert_eq!(state.visible().unwrap().len(), 1);
    }

    #[test]
    fn test_failure_restores_previous_list() {
        let state = ToggleState::begin(&[listing(1)], &listing(2));
        let settled = state.settle(Err(BackendError::RemoteError("500: boom".into()).into()));

        assert_eq!(settled.status(), ToggleStatus::RolledBack);
        let ids: Vec<u64> = settled.visible().unwrap().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_apply_leaves_other_changes_alone() {
        // 1 was added by another toggle after this one began
        let adding = ToggleState::begin(&[], &listing(2));
        let mut current = vec![listing(1), listing(2)];
        adding
            .settle(Err(BackendError::RemoteError("500: boom".into()).into()))
            .apply_to(&mut current);
        assert_eq!(current, vec![listing(1)]);

        let removing = ToggleState::begin(&[listing(3)], &listing(3));
        let mut current = vec![listing(4)];
        removing
            .settle(Err(BackendError::RemoteError("500: boom".into()).into()))
            .apply_to(&mut current);
        assert_eq!(current, vec![listing(4), listing(3)]);

        let committed = ToggleState::begin(&[], &listing(5)).settle(Ok(()));
        let mut current = vec![listing(5), listing(6)];
        committed.apply_to(&mut current);
        assert_eq!(current, vec![listing(5), listing(6)]);
    }

    #[test]
    fn test_settle_is_noop_outside_pending() {
        assert_eq!(ToggleState::Idle.settle(Ok(())), ToggleState::Idle);
    }

    #[tokio::test]
    async fn test_list_reads_snapshots() {
        let mut store = MockRecordStore::new();
        store
            .expect_select()
            .withf(|table, columns, filters| {
                table == "bookmarks"
                    && columns == "repository_data"
                    && filters == [Filter::eq("user_id", "u1")]
            })
            .returning(|_, _, _| {
                Ok(vec![
                    serde_json::json!({ "repository_data": serde_json::to_value(listing(3)).unwrap() }),
                    serde_json::json!({ "repository_data": "garbage" }),
                ])
            });

        let service = BookmarkService::new(Arc::new(store));
        let listings = service.list("u1").await.unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].id, 3);
    }

    #[tokio::test]
    async fn test_remove_filters_on_user_and_repo() {
        let mut store = MockRecordStore::new();
        store
            .expect_delete()
            .withf(|table, filters| {
                table == "bookmarks"
                    && filters == [Filter::eq("user_id", "u1"), Filter::eq("repository_id", 9u64)]
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let service = BookmarkService::new(Arc::new(store));
        service.remove("u1", 9).await.unwrap();
    }

    #[tokio::test]
    async fn test_toggle_rolls_back_failed_insert() {
        let mut store = MockRecordStore::new();
        store
            .expect_insert()
            .times(1)
            .returning(|_, _| Err(BackendError::RemoteError("503: unavailable".into())));

        let service = BookmarkService::new(Arc::new(store));
        let state = service.toggle("u1", &[listing(1)], &listing(2)).await;

        assert_eq!(state.status(), ToggleStatus::RolledBack);
        assert_eq!(state.visible().unwrap(), &[listing(1)]);
    }

    #[tokio::test]
    async fn test_toggle_insert_carries_snapshot() {
        let mut store = MockRecordStore::new();
        store
            .expect_insert()
            .withf(|table, rows| {
                table == "bookmarks"
                    && rows.len() == 1
                    && rows[0]["user_id"] == "u1"
                    && rows[0]["repository_id"] == 2
                    && rows[0]["repository_data"]["full_name"] == "o/r2"
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let service = BookmarkService::new(Arc::new(store));
        let state = service.toggle("u1", &[], &listing(2)).await;
        assert_eq!(state.status(), ToggleStatus::Added);
    }
}
