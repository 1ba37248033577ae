// API clients for GitHub search and the hosted backend
pub mod backend;
pub mod github;
pub mod retry;

// Re-export common types
pub use backend::{
    AuthIdentity, AuthSession, AuthUser, BackendClient, BackendConfig, BackendError, Filter,
    SignUpOutcome,
};
pub use github::{GitHubClient, GitHubError, GitHubOwner, GitHubRepo, SearchRequest, SearchResponse};
pub use retry::{with_retry, RetryConfig};
