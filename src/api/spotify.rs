use crate::config::Config;
use crate::error::ProxyError;
use crate::models::CurrentlyPlaying;
use log::{debug, warn};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};

/// Client for the currently-playing endpoint of the Spotify Web API.
pub struct SpotifyClient {
    client: Client,
    now_playing_url: String,
}

impl SpotifyClient {
    pub fn new(cfg: &Config, client: Client) -> Self {
        Self {
            client,
            now_playing_url: cfg.now_playing_url(),
        }
    }

    /// Returns `Ok(None)` when Spotify answers 204 (nothing playing).
    /// Any other non-2xx status becomes `ProxyError::UpstreamApi`.
    pub async fn get_currently_playing(
        &self,
        access_token: &str,
    ) -> Result<Option<CurrentlyPlaying>, ProxyError> {
        let resp = self
            .client
            .get(&self.now_playing_url)
            .header(AUTHORIZATION, format!("Bearer {}", access_token))
            .send()
            .await?;
        let status = resp.status();
        if status == StatusCode::NO_CONTENT {
            debug!("Spotify reports nothing playing (204)");
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("currently-playing failed: {} => {}", status, body);
            return Err(ProxyError::UpstreamApi {
                status: status.as_u16(),
            });
        }
        let payload: CurrentlyPlaying = resp.json().await?;
        Ok(Some(payload))
    }
}
