//! Bearer tokens for the Sheets API.
//!
//! With OAuth client credentials and a refresh token configured, access
//! tokens are fetched from the token endpoint and refreshed shortly before
//! they expire. Without them the static `access_token` from config is used
//! as-is.

use chrono::{DateTime, Duration, Utc};
use subclaw_core::config::StoreConfig;
use subclaw_core::error::{Result, SubClawError};
use tokio::sync::Mutex;

/// Tokens this close to expiry are refreshed early.
const EXPIRY_SKEW_SECS: i64 = 60;
/// Used when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

#[derive(Debug, Clone)]
struct RefreshCredentials {
    client_id: String,
    client_secret: String,
    refresh_token: String,
    token_uri: String,
}

#[derive(Debug, Clone, PartialEq)]
struct AccessToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now + Duration::seconds(EXPIRY_SKEW_SECS)
    }
}

/// Hands out a valid access token, refreshing it when needed.
pub struct TokenProvider {
    static_token: String,
    credentials: Option<RefreshCredentials>,
    /// Held across the refresh request so concurrent callers wait for one
    /// refresh instead of racing their own.
    cached: Mutex<Option<AccessToken>>,
    client: reqwest::Client,
}

impl TokenProvider {
    pub fn from_config(config: &StoreConfig) -> Self {
        let credentials = (!config.client_id.is_empty() && !config.refresh_token.is_empty())
            .then(|| RefreshCredentials {
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                refresh_token: config.refresh_token.clone(),
                token_uri: config.token_uri.clone(),
            });
        Self {
            static_token: config.access_token.clone(),
            credentials,
            cached: Mutex::new(None),
            client: reqwest::Client::new(),
        }
    }

    /// Whether tokens are refreshed from OAuth credentials.
    pub fn can_refresh(&self) -> bool {
        self.credentials.is_some()
    }

    pub async fn access_token(&self) -> Result<String> {
        let Some(credentials) = &self.credentials else {
            if self.static_token.is_empty() {
                return Err(SubClawError::Auth("no Sheets access token configured".into()));
            }
            return Ok(self.static_token.clone());
        };

        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && !token.is_expired(Utc::now())
        {
            return Ok(token.token.clone());
        }

        let fresh = self.refresh(credentials).await?;
        tracing::debug!("🔑 Sheets access token refreshed (expires {})", fresh.expires_at);
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    /// Drop the cached token so the next call refreshes. Called after the
    /// API rejects a token before its recorded expiry.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn refresh(&self, credentials: &RefreshCredentials) -> Result<AccessToken> {
        let mut form = vec![
            ("client_id", credentials.client_id.as_str()),
            ("refresh_token", credentials.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];
        if !credentials.client_secret.is_empty() {
            form.push(("client_secret", credentials.client_secret.as_str()));
        }

        let response = self
            .client
            .post(&credentials.token_uri)
            .form(&form)
            .send()
            .await
            .map_err(|e| SubClawError::Auth(format!("token request failed: {e}")))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            tracing::error!("❌ Sheets token refresh rejected ({})", status);
            return Err(SubClawError::Auth(format!("token endpoint returned {status}: {body}")));
        }
        parse_token_response(&body, Utc::now())
    }
}

fn parse_token_response(body: &str, now: DateTime<Utc>) -> Result<AccessToken> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| SubClawError::Auth(format!("invalid token response: {e}")))?;
    let token = value["access_token"]
        .as_str()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| SubClawError::Auth("no access_token in token response".into()))?;
    let expires_in = value["expires_in"]
        .as_i64()
        .unwrap_or(DEFAULT_EXPIRES_IN_SECS);
    Ok(AccessToken {
        token: token.to_string(),
        expires_at: now + Duration::seconds(expires_in),
    })
}
