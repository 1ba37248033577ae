// Hosted backend client - PostgREST tables plus GoTrue auth
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

const PLACEHOLDER_URL: &str = "https://your-project.supabase.co";
const PLACEHOLDER_KEY: &str = "your-anon-key";

/// Postgres `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend not configured")]
    NotConfigured,

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Backend request failed: {0}")]
    RemoteError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BackendError>;

/// Connection settings for the hosted backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
}

impl BackendConfig {
    /// Returns `None` when either value is missing, blank, or still the sample placeholder
    pub fn from_parts(url: Option<String>, anon_key: Option<String>) -> Option<Self> {
        let url = url?.trim().trim_end_matches('/').to_string();
        let anon_key = anon_key?.trim().to_string();

        if url.is_empty() || anon_key.is_empty() {
            return None;
        }
        if url == PLACEHOLDER_URL || anon_key == PLACEHOLDER_KEY {
            return None;
        }

        Some(Self { url, anon_key })
    }
}

/// Equality predicate on a table column (`column=eq.value`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Self {
            column: column.into(),
            value: value.to_string(),
        }
    }

    fn as_param(&self) -> (String, String) {
        (self.column.clone(), format!("eq.{}", self.value))
    }
}

/// Error body shape shared by PostgREST and GoTrue
#[derive(Debug, Default, Deserialize)]
struct RemoteErrorBody {
    code: Option<Value>,
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    details: Option<String>,
}

impl RemoteErrorBody {
    fn text(&self) -> Option<String> {
        self.message
            .clone()
            .or_else(|| self.msg.clone())
            .or_else(|| self.error_description.clone())
            .or_else(|| self.details.clone())
    }

    fn code(&self) -> Option<String> {
        match &self.code {
            Some(Value::String(code)) => Some(code.clone()),
            Some(Value::Number(code)) => Some(code.to_string()),
            _ => None,
        }
    }
}

/// Signed-in session returned by the auth endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: AuthUser,
}

/// Auth user object. OAuth providers fill `user_metadata` and `identities` unevenly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Option<Map<String, Value>>,
    #[serde(default)]
    pub identities: Option<Vec<AuthIdentity>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthIdentity {
    #[serde(default)]
    pub identity_data: Option<Map<String, Value>>,
}

/// Sign-up either opens a session right away or waits for e-mail confirmation
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpOutcome {
    Session(AuthSession),
    PendingConfirmation(AuthUser),
}

pub struct BackendClient {
    client: reqwest::Client,
    config: Option<BackendConfig>,
    access_token: Option<String>,
}

impl BackendClient {
    /// A client without config is valid; every call then fails with `NotConfigured`
    pub fn new(config: Option<BackendConfig>) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            config,
            access_token: None,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    /// Act on behalf of a signed-in user instead of the anonymous key
    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token;
        self
    }

    fn require_config(&self) -> Result<&BackendConfig> {
        self.config.as_ref().ok_or(BackendError::NotConfigured)
    }

    fn authorize(&self, config: &BackendConfig, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&config.anon_key);
        request.header("apikey", &config.anon_key).bearer_auth(bearer)
    }

    fn table_url(config: &BackendConfig, table: &str) -> String {
        format!("{}/rest/v1/{}", config.url, table)
    }

    fn auth_url(config: &BackendConfig, path: &str) -> String {
        format!("{}/auth/v1/{}", config.url, path)
    }

    /// Select `columns` from `table` where every filter matches
    pub async fn select(&self, table: &str, columns: &str, filters: &[Filter]) -> Result<Vec<Value>> {
        let config = self.require_config()?;
        let mut params: Vec<(String, String)> = vec![("select".to_string(), columns.to_string())];
        params.extend(filters.iter().map(Filter::as_param));

        debug!("select {} from {} ({} filters)", columns, table, filters.len());
        let request = self.client.get(Self::table_url(config, table)).query(&params);
        let response = check(self.authorize(config, request).send().await?).await?;

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn insert(&self, table: &str, rows: &[Value]) -> Result<()> {
        let config = self.require_config()?;

        debug!("insert {} rows into {}", rows.len(), table);
        let request = self
            .client
            .post(Self::table_url(config, table))
            .header("Prefer", "return=minimal")
            .json(rows);
        check(self.authorize(config, request).send().await?).await?;
        Ok(())
    }

    pub async fn delete(&self, table: &str, filters: &[Filter]) -> Result<()> {
        let config = self.require_config()?;
        if filters.is_empty() {
            return Err(BackendError::RemoteError(format!(
                "refusing to delete from {} without filters",
                table
            )));
        }

        let params: Vec<(String, String)> = filters.iter().map(Filter::as_param).collect();

        debug!("delete from {} ({} filters)", table, filters.len());
        let request = self.client.delete(Self::table_url(config, table)).query(&params);
        check(self.authorize(config, request).send().await?).await?;
        Ok(())
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        let config = self.require_config()?;
        let request = self
            .client
            .post(Self::auth_url(config, "signup"))
            .json(&serde_json::json!({ "email": email, "password": password }));
        let response = check(self.authorize(config, request).send().await?).await?;

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession> {
        let config = self.require_config()?;
        let request = self
            .client
            .post(Self::auth_url(config, "token"))
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({ "email": email, "password": password }));
        let response = check(self.authorize(config, request).send().await?).await?;

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Resolve the user behind the current access token
    pub async fn current_user(&self) -> Result<AuthUser> {
        let config = self.require_config()?;
        if self.access_token.is_none() {
            return Err(BackendError::RemoteError("no active session".to_string()));
        }

        let request = self.client.get(Self::auth_url(config, "user"));
        let response = check(self.authorize(config, request).send().await?).await?;

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn sign_out(&self) -> Result<()> {
        let config = self.require_config()?;
        if self.access_token.is_none() {
            return Ok(());
        }

        let request = self.client.post(Self::auth_url(config, "logout"));
        check(self.authorize(config, request).send().await?).await?;
        Ok(())
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(classify_remote_error(status.as_u16(), &body))
}

/// Turn an error response into `ConstraintViolation` or `RemoteError`
pub fn classify_remote_error(status: u16, body: &str) -> BackendError {
    let parsed: RemoteErrorBody = serde_json::from_str(body).unwrap_or_default();
    let text = parsed
        .text()
        .unwrap_or_else(|| if body.is_empty() { "no details".to_string() } else { body.to_string() });

    if status == 409 || parsed.code().as_deref() == Some(UNIQUE_VIOLATION) {
        BackendError::ConstraintViolation(text)
    } else {
        BackendError::RemoteError(format!("{}: {}", status, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_rejects_placeholders() {
        assert!(BackendConfig::from_parts(None, Some("key".into())).is_none());
        assert!(BackendConfig::from_parts(Some("https://x.supabase.co".into()), None).is_none());
        assert!(BackendConfig::from_parts(Some(PLACEHOLDER_URL.into()), Some("key".into())).is_none());
        assert!(BackendConfig::from_parts(Some("https://x.supabase.co".into()), Some(PLACEHOLDER_KEY.into())).is_none());
        assert!(BackendConfig::from_parts(Some("  ".into()), Some("key".into())).is_none());
    }

    #[test]
    fn test_config_trims_trailing_slash() {
        let config = BackendConfig::from_parts(
            Some("https://x.supabase.co/ ".into()),
            Some(" key ".into()),
        )
        .unwrap();
        assert_eq!(config.url, "https://x.supabase.co");
        assert_eq!(config.anon_key, "key");
    }

    #[tokio::test]
    async fn test_unconfigured_client_never_touches_network() {
        let client = BackendClient::new(None).unwrap();
        assert!(!client.is_configured());

        let selected = client.select("bookmarks", "*", &[Filter::eq("user_id", "u1")]).await;
        assert!(matches!(selected, Err(BackendError::NotConfigured)));

        let inserted = client.insert("bookmarks", &[serde_json::json!({})]).await;
        assert!(matches!(inserted, Err(BackendError::NotConfigured)));

        let deleted = client.delete("bookmarks", &[Filter::eq("id", 1)]).await;
        assert!(matches!(deleted, Err(BackendError::NotConfigured)));

        let user = client.current_user().await;
        assert!(matches!(user, Err(BackendError::NotConfigured)));
    }

    #[test]
    fn test_filter_param() {
        let filter = Filter::eq("repository_id", 42u64);
        assert_eq!(filter.as_param(), ("repository_id".to_string(), "eq.42".to_string()));
    }

    #[test]
    fn test_unique_violation_is_constraint_violation() {
        let body = r#"{"code":"23505","message":"duplicate key value violates unique constraint"}"#;
        match classify_remote_error(409, body) {
            BackendError::ConstraintViolation(msg) => assert!(msg.contains("duplicate key")),
            other => panic!("unexpected {:?}", other),
        }

        // Some proxies rewrite the status; the Postgres code still wins
        assert!(matches!(
            classify_remote_error(400, body),
            BackendError::ConstraintViolation(_)
        ));
    }

    #[test]
    fn test_other_failures_are_remote_errors() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        match classify_remote_error(400, body) {
            BackendError::RemoteError(msg) => {
                assert!(msg.starts_with("400"));
                assert!(msg.contains("Invalid login credentials"));
            }
            other => panic!("unexpected {:?}", other),
        }

        match classify_remote_error(502, "") {
            BackendError::RemoteError(msg) => assert!(msg.contains("no details")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_sign_up_outcomes() {
        let pending = r#"{"id":"u1","email":"a@b.c"}"#;
        assert!(matches!(
            serde_json::from_str::<SignUpOutcome>(pending).unwrap(),
            SignUpOutcome::PendingConfirmation(_)
        ));

        let session = r#"{"access_token":"t","user":{"id":"u1"}}"#;
        assert!(matches!(
            serde_json::from_str::<SignUpOutcome>(session).unwrap(),
            SignUpOutcome::Session(_)
        ));
    }

    #[test]
    fn test_auth_user_tolerates_nulls() {
        let body = r#"{"id":"u1","email":null,"user_metadata":null,"identities":null}"#;
        let user: AuthUser = serde_json::from_str(body).unwrap();
        assert_eq!(user.id, "u1");
        assert!(user.user_metadata.is_none());
        assert!(user.identities.is_none());
    }
}
