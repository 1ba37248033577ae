// Core business logic lives here - queries, ranking, user data, view state
pub mod aggregate;
pub mod auth;
pub mod bookmarks;
pub mod config;
pub mod controller;
pub mod error;
pub mod ideas;
pub mod models;
pub mod providers;
pub mod query;
pub mod search;
pub mod store;
pub mod submissions;
pub mod token_store;
pub mod user_repos;

pub use aggregate::{aggregate, rank, Aggregation, RankingProfile};
pub use auth::UserProfile;
pub use bookmarks::{BookmarkService, ToggleState, ToggleStatus};
pub use config::Config;
pub use controller::{AutoRefresh, ControllerSettings, HomeController, View, ViewState};
pub use error::Error;
pub use ideas::{project_ideas, ProjectIdea};
pub use models::{
    Bookmark, Difficulty, Language, Owner, RepositoryListing, ReviewStatus, SearchFilters, SortKey,
    SortOrder, SubmittedRepo,
};
pub use query::{popular_languages, QueryBuilder, QueryMode, StarBand};
pub use search::{SearchPage, SearchProvider};
pub use store::RecordStore;
pub use submissions::{SubmissionDraft, SubmissionService};
pub use token_store::TokenStore;
pub use user_repos::UserRepositories;

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
