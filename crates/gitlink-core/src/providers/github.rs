// GitHub provider - bridges the API client with the SearchProvider trait
use async_trait::async_trait;
use gitlink_api::{GitHubClient, GitHubRepo, SearchRequest};

use crate::{
    models::{Owner, RepositoryListing},
    search::{SearchPage, SearchProvider},
    Result,
};

/// Wrapper around GitHubClient that implements SearchProvider
pub struct GitHubProvider {
    client: GitHubClient,
}

impl GitHubProvider {
    pub fn new(client: GitHubClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &GitHubClient {
        &self.client
    }
}

#[async_trait]
impl SearchProvider for GitHubProvider {
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage> {
        let response = self.client.search_repositories(request).await?;

        Ok(SearchPage {
            items: response.items.into_iter().map(github_to_listing).collect(),
            total_count: response.total_count,
        })
    }

    async fn user_repositories(&self, login: &str) -> Result<Vec<RepositoryListing>> {
        let repos = self.client.user_repositories(login).await?;
        Ok(repos.into_iter().map(github_to_listing).collect())
    }

    async fn user_avatar(&self, login: &str) -> Result<Option<String>> {
        Ok(self.client.user_avatar(login).await?)
    }
}

/// Convert a GitHub API repo to our listing model
pub fn github_to_listing(gh: GitHubRepo) -> RepositoryListing {
    RepositoryListing {
        id: gh.id,
        name: gh.name,
        full_name: gh.full_name,
        owner: Owner {
            login: gh.owner.login,
            avatar_url: gh.owner.avatar_url,
        },
        description: gh.description,
        language: gh.language,
        topics: gh.topics,
        stars: gh.stargazers_count,
        forks: gh.forks_count,
        open_issues: gh.open_issues_count,
        has_issues: gh.has_issues,
        created_at: gh.created_at,
        updated_at: gh.updated_at,
        url: gh.html_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_keeps_counts_and_owner() {
        let gh: GitHubRepo = serde_json::from_value(serde_json::json!({
            "id": 99,
            "name": "demo",
            "full_name": "octo/demo",
            "description": "a demo",
            "html_url": "https://github.com/octo/demo",
            "stargazers_count": 321,
            "forks_count": 12,
            "language": "Rust",
            "created_at": "2023-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
            "topics": ["cli"],
            "owner": {"login": "octo", "avatar_url": "https://avatars/octo"},
            "has_issues": true,
            "open_issues_count": 4
        }))
        .unwrap();

        let listing = github_to_listing(gh);
        assert_eq!(listing.id, 99);
        assert_eq!(listing.stars, 321);
        assert_eq!(listing.open_issues, 4);
        assert!(listing.has_issues);
        assert_eq!(listing.owner.login, "octo");
        assert_eq!(listing.url, "https://github.com/octo/demo");
        assert_eq!(listing.topics, vec!["cli".to_string()]);
    }
}
