// Wires config, clients and the stored session together for one CLI run
use anyhow::Context;
use gitlink_api::{BackendClient, GitHubClient};
use gitlink_cache::ListingCache;
use gitlink_core::{
    auth, providers::{GitHubProvider, SupabaseStore}, Config, ControllerSettings, HomeController,
    RecordStore, SearchProvider, TokenStore, UserProfile,
};
use std::sync::Arc;

pub struct App {
    pub config: Config,
    pub github: Arc<GitHubProvider>,
}

impl App {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let client = GitHubClient::with_base_url(config.github.token.clone(), config.github.api_url.clone())
            .context("Failed to build GitHub client")?;
        if !client.has_token() {
            tracing::debug!("No GitHub token, using the anonymous rate limit");
        }

        Ok(Self {
            config,
            github: Arc::new(GitHubProvider::new(client)),
        })
    }

    pub fn provider(&self) -> Arc<dyn SearchProvider> {
        self.github.clone()
    }

    /// Backend client acting as `access_token`, or anonymously
    pub fn backend(&self, access_token: Option<String>) -> anyhow::Result<BackendClient> {
        Ok(BackendClient::new(self.config.backend_config())?.with_access_token(access_token))
    }

    pub fn is_backend_configured(&self) -> bool {
        self.config.backend_config().is_some()
    }

    pub fn stored_token(&self) -> Option<String> {
        match TokenStore::load() {
            Ok(store) => store.access_token(),
            Err(e) => {
                tracing::warn!("Ignoring unreadable session file: {}", e);
                None
            }
        }
    }

    /// Store authorized as the signed-in user when there is one
    pub fn store(&self) -> anyhow::Result<Arc<dyn RecordStore>> {
        Ok(Arc::new(SupabaseStore::new(self.backend(self.stored_token())?)))
    }

    pub async fn current_user(&self) -> anyhow::Result<Option<UserProfile>> {
        let Some(token) = self.stored_token() else {
            return Ok(None);
        };
        Ok(auth::current_profile(&self.backend(Some(token))?).await)
    }

    pub async fn require_user(&self) -> anyhow::Result<UserProfile> {
        if !self.is_backend_configured() {
            anyhow::bail!("Backend not configured. Set SUPABASE_URL and SUPABASE_ANON_KEY.");
        }
        self.current_user()
            .await?
            .ok_or_else(|| anyhow::anyhow!("Not signed in. Run `gitlink login` first."))
    }

    pub fn controller(&self) -> anyhow::Result<HomeController> {
        Ok(HomeController::new(
            self.provider(),
            self.store()?,
            ControllerSettings::from_config(&self.config),
        ))
    }

    pub fn cache(&self) -> anyhow::Result<Arc<ListingCache>> {
        let path = self.config.cache_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let cache = ListingCache::open(&path, self.config.cache_freshness())
            .with_context(|| format!("Failed to open cache at {}", path.display()))?;
        Ok(Arc::new(cache))
    }
}
