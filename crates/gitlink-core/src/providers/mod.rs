// Concrete implementations of the provider seams
pub mod github;
pub mod supabase;

pub use github::GitHubProvider;
pub use supabase::SupabaseStore;
