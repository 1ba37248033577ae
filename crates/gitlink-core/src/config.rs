use gitlink_api::BackendConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::aggregate::RankingProfile;
use crate::query::StarBand;

/// Main configuration structure
///
/// Loaded from `<config_dir>/gitlink/config.toml`, then overridden by
/// environment variables. CLI flags win over both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub github: GitHubConfig,
    pub backend: BackendSettings,
    pub cache: CacheConfig,
    pub ranking: RankingConfig,
    pub beginner: StarBand,
    pub refresh: RefreshConfig,
}

/// Env var pairs: the plain name first, then the one older `.env` files use
const TOKEN_VARS: [&str; 2] = ["GITHUB_TOKEN", "VITE_GITHUB_TOKEN"];
const URL_VARS: [&str; 2] = ["SUPABASE_URL", "VITE_SUPABASE_URL"];
const KEY_VARS: [&str; 2] = ["SUPABASE_ANON_KEY", "VITE_SUPABASE_ANON_KEY"];

impl Config {
    /// File (if any) plus environment
    pub fn load() -> crate::Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self) -> crate::Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&config_path, contents)?;
        Ok(())
    }

    /// Override secrets and endpoints from the environment; blank values are ignored
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |names: &[&str]| {
            names
                .iter()
                .filter_map(|n| lookup(*n))
                .find(|v| !v.trim().is_empty())
        };

        if let Some(token) = first(&TOKEN_VARS) {
            self.github.token = Some(token);
        }
        if let Some(url) = first(&URL_VARS) {
            self.backend.url = Some(url);
        }
        if let Some(key) = first(&KEY_VARS) {
            self.backend.anon_key = Some(key);
        }
    }

    /// `None` when the backend is missing or still holds placeholder values
    pub fn backend_config(&self) -> Option<BackendConfig> {
        BackendConfig::from_parts(self.backend.url.clone(), self.backend.anon_key.clone())
    }

    pub fn cache_path(&self) -> crate::Result<PathBuf> {
        match &self.cache.path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("cache.db")),
        }
    }

    pub fn cache_freshness(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.cache.freshness_minutes)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh.interval_minutes.max(1) * 60)
    }

    /// Uses XDG on Linux/macOS, AppData on Windows
    pub fn config_path() -> crate::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find config directory".into()))?;
        Ok(config_dir.join("gitlink").join("config.toml"))
    }
}

fn data_dir() -> crate::Result<PathBuf> {
    let dir = dirs::data_dir().ok_or_else(|| crate::Error::ConfigError("Could not find data directory".into()))?;
    Ok(dir.join("gitlink"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Personal access token. Optional, only raises the rate limit.
    pub token: Option<String>,

    /// API URL (for GitHub Enterprise)
    #[serde(default = "default_github_url")]
    pub api_url: String,
}

fn default_github_url() -> String {
    "https://api.github.com".to_string()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: default_github_url(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendSettings {
    pub url: Option<String>,
    pub anon_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_freshness")]
    pub freshness_minutes: i64,

    /// SQLite file; defaults to the user data dir
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_freshness() -> i64 {
    gitlink_cache::DEFAULT_FRESHNESS_MINUTES
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            freshness_minutes: default_freshness(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    #[serde(default = "RankingProfile::trending")]
    pub trending: RankingProfile,
    #[serde(default = "RankingProfile::educational")]
    pub educational: RankingProfile,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            trending: RankingProfile::trending(),
            educational: RankingProfile::educational(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_refresh_minutes")]
    pub interval_minutes: u64,
}

fn default_refresh_minutes() -> u64 {
    30
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_refresh_minutes(),
        }
    }
}
