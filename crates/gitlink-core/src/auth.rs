// Signed-in user profile, derived from whatever the auth provider handed back
use gitlink_api::{AuthSession, AuthUser, BackendClient, SignUpOutcome};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    /// GitHub login; empty when nothing usable was found
    pub login: String,
    pub name: String,
    pub avatar_url: String,
    pub email: Option<String>,
}

impl UserProfile {
    /// Build a profile with the usual fallbacks:
    /// metadata first, then the e-mail local part for the login, then the
    /// first linked identity for anything still missing.
    pub fn from_auth_user(user: &AuthUser) -> Self {
        let email = user.email.clone().filter(|e| !e.is_empty());
        let empty = Map::new();
        let meta = user.user_metadata.as_ref().unwrap_or(&empty);

        let mut avatar_url = first_str(meta, &["avatar_url"]).unwrap_or_default();
        let mut name = first_str(meta, &["full_name", "name"])
            .or_else(|| email.clone())
            .unwrap_or_default();
        let mut login = first_str(meta, &["user_name", "login"]).unwrap_or_default();

        if login.is_empty() {
            if let Some((local, _)) = email.as_deref().and_then(|e| e.split_once('@')) {
                login = local.to_string();
            }
        }

        let identity = user
            .identities
            .as_ref()
            .and_then(|ids| ids.first())
            .and_then(|id| id.identity_data.as_ref());

        if let Some(data) = identity {
            if avatar_url.is_empty() {
                avatar_url = first_str(data, &["avatar_url"]).unwrap_or_default();
            }
            if name.is_empty() {
                name = first_str(data, &["full_name", "name"]).unwrap_or_default();
            }
            if login.is_empty() {
                login = first_str(data, &["user_name", "login"]).unwrap_or_default();
            }
        }

        Self {
            id: user.id.clone(),
            login,
            name,
            avatar_url,
            email,
        }
    }

    pub fn has_login(&self) -> bool {
        !self.login.is_empty()
    }
}

fn first_str(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| map.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Result of a sign-up attempt
#[derive(Debug, Clone)]
pub enum SignUp {
    SignedIn(AuthSession, UserProfile),
    /// The provider sent a confirmation e-mail; no session yet
    AwaitingConfirmation(UserProfile),
}

pub async fn sign_up(client: &BackendClient, email: &str, password: &str) -> Result<SignUp> {
    let outcome = client.sign_up(email, password).await?;
    Ok(match outcome {
        SignUpOutcome::Session(session) => {
            let profile = UserProfile::from_auth_user(&session.user);
            info!("Signed up and signed in as {}", profile.id);
            SignUp::SignedIn(session, profile)
        }
        SignUpOutcome::PendingConfirmation(user) => {
            info!("Sign-up pending e-mail confirmation");
            SignUp::AwaitingConfirmation(UserProfile::from_auth_user(&user))
        }
    })
}

pub async fn sign_in(client: &BackendClient, email: &str, password: &str) -> Result<(AuthSession, UserProfile)> {
    let session = client.sign_in_with_password(email, password).await?;
    let profile = UserProfile::from_auth_user(&session.user);
    info!("Signed in as {}", profile.id);
    Ok((session, profile))
}

/// Profile behind the client's access token, or `None` without a usable session
pub async fn current_profile(client: &BackendClient) -> Option<UserProfile> {
    match client.current_user().await {
        Ok(user) => Some(UserProfile::from_auth_user(&user)),
        Err(e) => {
            debug!("No current user: {}", e);
            None
        }
    }
}
