use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use gitlink_api::AuthSession;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Sessions without an expiry from the auth server are kept this long
const DEFAULT_VALIDITY_HOURS: i64 = 24 * 7;

/// On-disk store for the signed-in session
///
/// The access token is XORed with a machine-specific key and base64 encoded.
/// This is obfuscation, not encryption: it keeps the token out of casual
/// `cat` output and makes the file useless on another machine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenStore {
    session: Option<StoredSession>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSession {
    user_id: String,
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    stored_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the default location, empty when nothing was saved yet
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::store_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| Error::ConfigError(format!("Failed to parse session file: {}", e)))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::store_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn set_session(&mut self, session: &AuthSession, now: DateTime<Utc>) {
        let expires_at = session
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| session.expires_in.map(|secs| now + Duration::seconds(secs)))
            .unwrap_or_else(|| now + Duration::hours(DEFAULT_VALIDITY_HOURS));

        self.session = Some(StoredSession {
            user_id: session.user.id.clone(),
            access_token: obfuscate(&session.access_token),
            refresh_token: session.refresh_token.as_deref().map(obfuscate),
            stored_at: now,
            expires_at,
        });
    }

    /// Access token, unless it expired by `now`
    pub fn access_token_at(&self, now: DateTime<Utc>) -> Option<String> {
        let stored = self.session.as_ref()?;
        if now >= stored.expires_at {
            return None;
        }
        reveal(&stored.access_token)
    }

    pub fn access_token(&self) -> Option<String> {
        self.access_token_at(Utc::now())
    }

    pub fn user_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.user_id.as_str())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.session.as_ref().map(|s| s.expires_at)
    }

    pub fn clear(&mut self) {
        self.session = None;
    }

    /// `<data_dir>/gitlink/session.json`
    pub fn store_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir().ok_or_else(|| Error::ConfigError("Could not find data directory".into()))?;
        Ok(data_dir.join("gitlink").join("session.json"))
    }
}

fn obfuscate(plain: &str) -> String {
    STANDARD.encode(xor(plain.as_bytes()))
}

fn reveal(encoded: &str) -> Option<String> {
    let bytes = STANDARD.decode(encoded).ok()?;
    String::from_utf8(xor(&bytes)).ok()
}

fn xor(data: &[u8]) -> Vec<u8> {
    let key = machine_key();
    data.iter()
        .enumerate()
        .map(|(i, b)| b ^ key[i % key.len()])
        .collect()
}

/// 32-byte key seeded from hostname + username
fn machine_key() -> Vec<u8> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let hostname = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let seed = format!("gitlink-{}-{}", hostname, whoami::username());

    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    let mut val = hasher.finish();

    let mut key = Vec::with_capacity(32);
    for _ in 0..4 {
        key.extend_from_slice(&val.to_le_bytes());
        val = val.wrapping_mul(1103515245).wrapping_add(12345);
    }
    key
}
