use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use url::Url;

use crate::domain::error::IdentityProviderError;

pub(crate) fn transport_error(e: reqwest::Error) -> IdentityProviderError {
    IdentityProviderError::Transport(e.to_string())
}

/// Tokens this close to expiry are refreshed before use.
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// How the session authenticates against the admin realm.
#[derive(Clone)]
pub enum AdminCredentials {
    Password { username: String, password: String },
    ClientSecret(String),
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::ClientSecret(_) => f.write_str("ClientSecret(***)"),
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    /// An `expires_in` too large to represent yields a token that is already stale.
    fn new(access_token: String, expires_in: u64) -> Self {
        let now = Instant::now();
        let expires_at = now
            .checked_add(Duration::from_secs(expires_in))
            .unwrap_or(now);
        Self {
            access_token,
            expires_at,
        }
    }

    fn is_fresh(&self) -> bool {
        Instant::now() + EXPIRY_MARGIN < self.expires_at
    }
}

struct SessionInner {
    http: reqwest::Client,
    token_url: Url,
    client_id: String,
    credentials: AdminCredentials,
    cached: RwLock<Option<CachedToken>>,
}

/// Authenticated administrative session against one Keycloak server.
///
/// Cloning is cheap and clones share the cached access token.
#[derive(Clone)]
pub struct KeycloakAdminSession {
    inner: Arc<SessionInner>,
}

impl KeycloakAdminSession {
    pub fn new(
        http: reqwest::Client,
        base_url: &Url,
        admin_realm: &str,
        client_id: String,
        credentials: AdminCredentials,
    ) -> Result<Self, IdentityProviderError> {
        let mut token_url = base_url.clone();
        token_url
            .path_segments_mut()
            .map_err(|()| IdentityProviderError::Transport(format!("invalid base URL {base_url}")))?
            .pop_if_empty()
            .extend(["realms", admin_realm, "protocol", "openid-connect", "token"]);

        Ok(Self {
            inner: Arc::new(SessionInner {
                http,
                token_url,
                client_id,
                credentials,
                cached: RwLock::new(None),
            }),
        })
    }

    /// Returns a valid access token, logging in again when the cached one is stale.
    pub async fn access_token(&self) -> Result<String, IdentityProviderError> {
        if let Some(token) = self.inner.cached.read().await.as_ref() {
            if token.is_fresh() {
                return Ok(token.access_token.clone());
            }
        }

        let mut cached = self.inner.cached.write().await;
        // another task may have refreshed while we waited for the lock
        if let Some(token) = cached.as_ref() {
            if token.is_fresh() {
                return Ok(token.access_token.clone());
            }
        }
        let token = self.login().await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    /// Drops the cached token so the next call authenticates again.
    pub async fn invalidate(&self) {
        *self.inner.cached.write().await = None;
    }

    #[instrument(skip_all, fields(client_id = %self.inner.client_id))]
    async fn login(&self) -> Result<CachedToken, IdentityProviderError> {
        let client_id = self.inner.client_id.as_str();
        let form: Vec<(&str, &str)> = match &self.inner.credentials {
            AdminCredentials::Password { username, password } => vec![
                ("grant_type", "password"),
                ("client_id", client_id),
                ("username", username.as_str()),
                ("password", password.as_str()),
            ],
            AdminCredentials::ClientSecret(secret) => vec![
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", secret.as_str()),
            ],
        };

        let response = self
            .inner
            .http
            .post(self.inner.token_url.clone())
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityProviderError::Authentication(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| IdentityProviderError::Authentication(e.to_string()))?;
        debug!(expires_in = token.expires_in, "Obtained admin access token");

        Ok(CachedToken::new(token.access_token, token.expires_in))
    }
}
