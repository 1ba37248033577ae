use chrono::{DateTime, TimeZone, Utc};
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const GITHUB_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "GitLink-Hub/0.1.0";
const ACCEPT: &str = "application/vnd.github.v3+json";

/// Token value shipped in sample `.env` files; treated as no token at all
const PLACEHOLDER_TOKEN: &str = "your_github_token_here";

#[derive(Error, Debug)]
pub enum GitHubError {
    #[error(
        "GitHub API rate limit exceeded. Rate limit resets at {}. Consider adding a GitHub token for higher limits.",
        format_reset(.reset_at)
    )]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    #[error("GitHub API access forbidden. Please check your token permissions.")]
    Forbidden,

    #[error("GitHub API authentication failed. Please check your token.")]
    Unauthorized,

    #[error("Network error: unable to connect to GitHub API: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("GitHub API error: {status} - {reason}")]
    ApiError { status: u16, reason: String },

    #[error("JSON parsing failed: {0}")]
    ParseError(#[from] serde_json::Error),
}

fn format_reset(reset_at: &Option<DateTime<Utc>>) -> String {
    match reset_at {
        Some(at) => at.format("%H:%M:%S UTC").to_string(),
        None => "unknown".to_string(),
    }
}

impl GitHubError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, GitHubError::RateLimited { .. })
    }

    /// Failures worth another attempt: transport errors and server-side hiccups.
    /// Rate limits are never transient from the caller's point of view.
    pub fn is_transient(&self) -> bool {
        match self {
            GitHubError::NetworkError(_) => true,
            GitHubError::ApiError { status, .. } => *status >= 500 || *status == 408,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, GitHubError>;

/// Map a non-2xx response onto the failure taxonomy.
///
/// `remaining` and `reset` are the raw `X-RateLimit-Remaining` and
/// `X-RateLimit-Reset` header values (the latter in epoch seconds).
pub fn classify_failure(status: StatusCode, remaining: Option<&str>, reset: Option<&str>) -> GitHubError {
    match status {
        StatusCode::FORBIDDEN => {
            if remaining.map(str::trim) == Some("0") {
                let reset_at = reset
                    .and_then(|r| r.trim().parse::<i64>().ok())
                    .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
                GitHubError::RateLimited { reset_at }
            } else {
                GitHubError::Forbidden
            }
        }
        StatusCode::UNAUTHORIZED => GitHubError::Unauthorized,
        other => GitHubError::ApiError {
            status: other.as_u16(),
            reason: other.canonical_reason().unwrap_or("Unknown").to_string(),
        },
    }
}

/// One call to the repository search endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: u32,
    pub per_page: u32,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            sort: None,
            order: None,
            page: 1,
            per_page: 30,
        }
    }

    pub fn sort(mut self, sort: impl Into<String>, order: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self.order = Some(order.into());
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn per_page(mut self, per_page: u32) -> Self {
        // GitHub caps search pages at 100 items
        self.per_page = per_page.clamp(1, 100);
        self
    }

    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("q", self.query.clone())];
        if let Some(sort) = &self.sort {
            params.push(("sort", sort.clone()));
        }
        if let Some(order) = &self.order {
            params.push(("order", order.clone()));
        }
        params.push(("page", self.page.to_string()));
        params.push(("per_page", self.per_page.to_string()));
        params
    }
}

/// GitHub repository search response
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<GitHubRepo>,
    #[serde(default)]
    pub total_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRepo {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub stargazers_count: u32,
    #[serde(default)]
    pub forks_count: u32,
    pub language: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub owner: GitHubOwner,
    #[serde(default)]
    pub has_issues: bool,
    #[serde(default)]
    pub open_issues_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubOwner {
    pub login: String,
    #[serde(default)]
    pub avatar_url: String,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    avatar_url: Option<String>,
}

pub struct GitHubClient {
    client: reqwest::Client,
    token: Option<String>,
    base_url: String,
}

impl GitHubClient {
    pub fn new(token: Option<String>) -> Result<Self> {
        Self::with_base_url(token, GITHUB_API_BASE.to_string())
    }

    /// For GitHub Enterprise or testing with custom API URL
    pub fn with_base_url(token: Option<String>, base_url: String) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static(USER_AGENT),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static(ACCEPT),
        );

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            token: token.filter(|t| usable_token(t)),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Whether requests carry a bearer token. Only changes the quota ceiling.
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Search repositories with a fully formed query
    pub async fn search_repositories(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let url = format!("{}/search/repositories", self.base_url);
        debug!("GitHub search: {}", request.query);
        self.get_json(&url, &request.params()).await
    }

    /// Get detailed info about a specific repository
    pub async fn get_repository(&self, owner: &str, name: &str) -> Result<GitHubRepo> {
        let url = format!(
            "{}/repos/{}/{}",
            self.base_url,
            urlencoding::encode(owner),
            urlencoding::encode(name)
        );
        self.get_json(&url, &[]).await
    }

    /// The 30 most recently updated public repositories of a user
    pub async fn user_repositories(&self, login: &str) -> Result<Vec<GitHubRepo>> {
        let url = format!("{}/users/{}/repos", self.base_url, urlencoding::encode(login));
        let params = [
            ("sort", "updated".to_string()),
            ("per_page", "30".to_string()),
            ("type", "public".to_string()),
        ];
        self.get_json(&url, &params).await
    }

    /// Avatar URL of a user, if GitHub has one
    pub async fn user_avatar(&self, login: &str) -> Result<Option<String>> {
        let url = format!("{}/users/{}", self.base_url, urlencoding::encode(login));
        let user: GitHubUser = self.get_json(&url, &[]).await?;
        Ok(user.avatar_url.filter(|a| !a.is_empty()))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, params: &[(&str, String)]) -> Result<T> {
        let mut request = self.client.get(url).query(params);

        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let headers = response.headers();
            let remaining = header_value(headers, "x-ratelimit-remaining");
            let reset = header_value(headers, "x-ratelimit-reset");
            return Err(classify_failure(status, remaining.as_deref(), reset.as_deref()));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

fn header_value(headers: &reqwest::header::HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

fn usable_token(token: &str) -> bool {
    let token = token.trim();
    !token.is_empty() && token != PLACEHOLDER_TOKEN
}
