use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::sync::RwLock;

const TOKEN_ENDPOINT: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/token";
const DEFAULT_SCOPE: &str = "https://graph.microsoft.com/Tasks.ReadWrite offline_access";

/// Delegated OAuth2 credential: app registration plus the refresh token
/// obtained from the user's consent flow.
#[derive(Debug, Clone)]
pub struct OAuth2Credential {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Redeems the refresh token for access tokens and caches them until close
/// to expiry.
#[derive(Clone)]
pub struct TokenProvider {
    credential: OAuth2Credential,
    http: reqwest::Client,
    cache: Arc<RwLock<Option<CachedToken>>>,
}

impl TokenProvider {
    pub fn new(credential: OAuth2Credential) -> Self {
        Self {
            credential,
            http: reqwest::Client::new(),
            cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Current access token, refreshed when the cached one is within a
    /// minute of expiring.
    pub async fn access_token(&self) -> Result<String> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref()
                && cached.expires_at > Instant::now() + Duration::from_secs(60)
            {
                return Ok(cached.access_token.clone());
            }
        }

        let scope = self.credential.scope.as_deref().unwrap_or(DEFAULT_SCOPE);
        let resp = self
            .http
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("client_id", self.credential.client_id.as_str()),
                ("client_secret", self.credential.client_secret.as_str()),
                ("refresh_token", self.credential.refresh_token.as_str()),
                ("scope", scope),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .context("token refresh request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("token refresh failed ({status}): {body}");
        }

        let token_resp: TokenResponse = resp
            .json()
            .await
            .context("failed to parse token response")?;
        let cached = CachedToken {
            access_token: token_resp.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(token_resp.expires_in),
        };

        let mut cache = self.cache.write().await;
        *cache = Some(cached);

        Ok(token_resp.access_token)
    }
}
