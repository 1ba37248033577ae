// Community repository submissions stored in `submitted_repos`
use gitlink_api::{BackendError, Filter};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    auth::UserProfile,
    models::{Difficulty, RepositoryListing, ReviewStatus, SubmittedRepo},
    search::SearchProvider,
    store::RecordStore,
    Error, Result,
};

const TABLE: &str = "submitted_repos";
const ANONYMOUS: &str = "anonymous";
pub const DUPLICATE_MESSAGE: &str = "This repository has already been submitted.";

/// What the submit form collects
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionDraft {
    pub github_url: String,
    pub description: String,
    pub tech_stack: Vec<String>,
    pub difficulty: Difficulty,
}

pub struct SubmissionService {
    store: Arc<dyn RecordStore>,
    provider: Arc<dyn SearchProvider>,
}

impl SubmissionService {
    pub fn new(store: Arc<dyn RecordStore>, provider: Arc<dyn SearchProvider>) -> Self {
        Self { store, provider }
    }

    /// Validate, reject duplicates, then insert as `pending`.
    ///
    /// The link is stored in its canonical form and the duplicate check runs
    /// on that form before the insert; a repository already on file fails
    /// with `ConstraintViolation` whoever submitted it.
    pub async fn submit(&self, draft: SubmissionDraft, user: Option<&UserProfile>) -> Result<SubmittedRepo> {
        let github_url = draft.github_url.trim().to_string();
        let description = draft.description.trim().to_string();

        if github_url.is_empty() {
            return Err(Error::ValidationError("repository link is required".into()));
        }
        if description.is_empty() {
            return Err(Error::ValidationError("description is required".into()));
        }
        let (url_owner, url_repo) = parse_github_url(&github_url)
            .ok_or_else(|| Error::ValidationError(format!("not a GitHub repository link: {}", github_url)))?;
        let canonical_url = canonical_github_url(url_owner, url_repo);

        let submitted_by = user
            .filter(|u| u.has_login())
            .map(|u| u.login.clone())
            .unwrap_or_else(|| url_owner.to_string());
        let submitted_by = if submitted_by.is_empty() {
            ANONYMOUS.to_string()
        } else {
            submitted_by
        };

        let owner_avatar = match user.map(|u| u.avatar_url.as_str()).filter(|a| !a.is_empty()) {
            Some(avatar) => Some(avatar.to_string()),
            None => self.lookup_avatar(&submitted_by).await,
        };

        self.ensure_not_submitted(&canonical_url).await?;

        let submission = SubmittedRepo {
            id: None,
            github_url: canonical_url,
            description,
            tech_stack: clean_tags(draft.tech_stack),
            difficulty: draft.difficulty,
            submitted_by: Some(submitted_by),
            status: ReviewStatus::Pending,
            created_at: None,
            owner_avatar,
        };

        self.store
            .insert(TABLE, vec![serde_json::to_value(&submission)?])
            .await?;
        info!("Submitted {} for review", submission.github_url);
        Ok(submission)
    }

    /// Submit one of the signed-in user's own repositories
    pub async fn upload_own(&self, listing: &RepositoryListing, user: &UserProfile) -> Result<SubmittedRepo> {
        let draft = SubmissionDraft {
            github_url: listing.url.clone(),
            description: listing.description.clone().unwrap_or_default(),
            tech_stack: listing.topics.clone(),
            difficulty: Difficulty::default(),
        };
        self.submit(draft, Some(user)).await
    }

    /// Submissions, newest first when the backend reports creation times
    pub async fn list(&self, status: Option<ReviewStatus>) -> Result<Vec<SubmittedRepo>> {
        let filters: Vec<Filter> = status
            .map(|s| vec![Filter::eq("status", s.as_str())])
            .unwrap_or_default();

        let rows = self.store.select(TABLE, "*", &filters).await?;
        let mut submissions = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<SubmittedRepo>(row) {
                Ok(s) => submissions.push(s),
                Err(e) => warn!("Skipping unreadable submission: {}", e),
            }
        }

        submissions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(submissions)
    }

    pub async fn delete(&self, submission: &SubmittedRepo, user: &UserProfile) -> Result<()> {
        if !can_delete(submission, user) {
            return Err(Error::PermissionDenied(format!(
                "{} was not submitted by {}",
                submission.github_url,
                if user.login.is_empty() { "you" } else { user.login.as_str() }
            )));
        }
        let id = submission
            .id
            .as_deref()
            .ok_or_else(|| Error::ValidationError("submission has no id".into()))?;

        self.store.delete(TABLE, &[Filter::eq("id", id)]).await?;
        info!("Deleted submission {}", id);
        Ok(())
    }

    async fn ensure_not_submitted(&self, github_url: &str) -> Result<()> {
        let existing = self
            .store
            .select(TABLE, "id", &[Filter::eq("github_url", github_url)])
            .await?;

        if existing.is_empty() {
            Ok(())
        } else {
            debug!("{} already submitted ({} rows)", github_url, existing.len());
            Err(BackendError::ConstraintViolation(DUPLICATE_MESSAGE.to_string()).into())
        }
    }

    async fn lookup_avatar(&self, login: &str) -> Option<String> {
        if login == ANONYMOUS {
            return None;
        }
        match self.provider.user_avatar(login).await {
            Ok(avatar) => avatar,
            Err(e) => {
                debug!("Avatar lookup for {} failed: {}", login, e);
                None
            }
        }
    }
}

/// Only the submitter may delete: logins match ignoring case, or nobody is
/// recorded and the link mentions the user's login.
pub fn can_delete(submission: &SubmittedRepo, user: &UserProfile) -> bool {
    if user.login.is_empty() {
        return false;
    }
    let login = user.login.to_lowercase();

    match submission.submitted_by.as_deref().filter(|s| !s.is_empty()) {
        Some(by) => by.to_lowercase() == login,
        None => submission.github_url.to_lowercase().contains(&login),
    }
}

/// `(owner, repo)` of a github.com repository link
pub fn parse_github_url(url: &str) -> Option<(&str, &str)> {
    let rest = url
        .trim()
        .strip_prefix("https://")
        .or_else(|| url.trim().strip_prefix("http://"))?;
    let rest = rest.strip_prefix("www.").unwrap_or(rest);
    let path = rest.strip_prefix("github.com/")?;

    let mut segments = path.split('/');
    let owner = segments.next().filter(|s| !s.is_empty())?;
    let repo = segments.next().filter(|s| !s.is_empty())?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);

    if repo.is_empty() {
        None
    } else {
        Some((owner, repo))
    }
}

/// Lowercased `https://github.com/<owner>/<repo>`; GitHub names ignore case
pub fn canonical_github_url(owner: &str, repo: &str) -> String {
    format!("https://github.com/{}/{}", owner.to_lowercase(), repo.to_lowercase())
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}
