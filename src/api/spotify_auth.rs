use crate::config::Config;
use crate::error::ProxyError;
use crate::models::AccessToken;
use crate::store::KvStore;
use anyhow::anyhow;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Owns the stored OAuth token pair.
///
/// A stored token is handed out as long as it is more than
/// `token_refresh_buffer_ms` away from expiry. Otherwise it is exchanged via
/// the refresh grant and the result replaces the stored value. Initial
/// issuance happens elsewhere; with nothing stored every call fails with
/// `ProxyError::Authentication`.
///
/// There is no coordination between concurrent refreshes: two requests that
/// both see an expiring token will both refresh and the later write wins.
pub struct TokenManager {
    client: Client,
    store: Arc<dyn KvStore>,
    client_id: String,
    token_key: String,
    token_url: String,
    refresh_buffer_ms: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: Option<String>,
    expires_in: i64,
    refresh_token: Option<String>,
}

impl TokenManager {
    pub fn new(cfg: &Config, store: Arc<dyn KvStore>, client: Client) -> Self {
        Self {
            client,
            store,
            client_id: cfg.client_id.clone(),
            token_key: cfg.keys.token.clone(),
            token_url: cfg.token_url(),
            refresh_buffer_ms: cfg.token_refresh_buffer_ms,
        }
    }

    pub async fn get_valid_token(&self) -> Result<AccessToken, ProxyError> {
        self.get_valid_token_at(chrono::Utc::now().timestamp_millis())
            .await
    }

    pub async fn get_valid_token_at(&self, now_ms: i64) -> Result<AccessToken, ProxyError> {
        let raw = self
            .store
            .get(&self.token_key)
            .await?
            .ok_or_else(|| ProxyError::Authentication("no token found in store".into()))?;
        let token: AccessToken = serde_json::from_str(&raw)?;

        if token.is_usable_at(now_ms, self.refresh_buffer_ms) {
            return Ok(token);
        }

        debug!(
            expires_at = token.expires_at,
            now_ms, "Spotify token is near expiry, refreshing"
        );
        let refreshed = self.refresh(&token, now_ms).await?;
        self.persist(&refreshed).await?;
        info!("Spotify token refreshed, valid until {}", refreshed.expires_at);
        Ok(refreshed)
    }

    async fn refresh(&self, cur: &AccessToken, now_ms: i64) -> Result<AccessToken, ProxyError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", cur.refresh_token.as_str()),
            ("client_id", self.client_id.as_str()),
        ];
        let resp = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("token refresh rejected: {} => {}", status, body);
            return Err(ProxyError::Authentication(format!(
                "token refresh failed: {}",
                status.as_u16()
            )));
        }

        let tr: TokenResponse = resp.json().await?;
        let expires_at = tr
            .expires_in
            .checked_mul(1000)
            .and_then(|ms| now_ms.checked_add(ms))
            .ok_or_else(|| anyhow!("token expires_in {} is out of range", tr.expires_in))?;
        Ok(AccessToken {
            access_token: tr.access_token,
            // Spotify does not always rotate the refresh token
            refresh_token: tr
                .refresh_token
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| cur.refresh_token.clone()),
            token_type: tr.token_type.unwrap_or_else(|| "Bearer".into()),
            expires_in: tr.expires_in,
            expires_at,
        })
    }

    async fn persist(&self, token: &AccessToken) -> Result<(), ProxyError> {
        let s = serde_json::to_string(token)?;
        self.store.put(&self.token_key, &s).await?;
        Ok(())
    }
}
