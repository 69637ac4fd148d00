use crate::api::spotify::SpotifyClient;
use crate::api::spotify_auth::TokenManager;
use crate::cache::TrackCache;
use crate::config::Config;
use crate::error::ProxyError;
use crate::format::format_track;
use crate::models::{CachedTrack, TrackInfo};
use crate::store::KvStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one request that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum NowPlaying {
    Playing(TrackInfo),
    NotPlaying,
}

/// Sequences cache, token, upstream call and formatter for a single request.
///
/// Holds no per-request state; the key-value store is the only thing shared
/// between requests.
pub struct NowPlayingService {
    cache: TrackCache,
    tokens: TokenManager,
    spotify: SpotifyClient,
}

impl NowPlayingService {
    pub fn new(cfg: &Config, store: Arc<dyn KvStore>) -> Self {
        let client = crate::api::http_client();
        Self {
            cache: TrackCache::new(cfg, store.clone()),
            tokens: TokenManager::new(cfg, store, client.clone()),
            spotify: SpotifyClient::new(cfg, client),
        }
    }

    pub fn cache(&self) -> &TrackCache {
        &self.cache
    }

    pub async fn handle(&self) -> Result<NowPlaying, ProxyError> {
        self.handle_at(chrono::Utc::now().timestamp_millis()).await
    }

    pub async fn handle_at(&self, now_ms: i64) -> Result<NowPlaying, ProxyError> {
        let cached = self.cache.read(now_ms).await?;
        if let Some(CachedTrack { data, is_fresh: true }) = &cached {
            debug!("serving fresh cached track");
            return Ok(NowPlaying::Playing(data.clone()));
        }

        let token = self.tokens.get_valid_token_at(now_ms).await?;
        let payload = self
            .spotify
            .get_currently_playing(&token.access_token)
            .await?;

        // 204, paused, or non-track items all fall back the same way
        match format_track(payload.as_ref()) {
            Some(track) => {
                self.cache.write(&track, now_ms).await?;
                info!(title = %track.title, artist = %track.artist, "now playing");
                Ok(NowPlaying::Playing(track))
            }
            None => Ok(Self::fallback(cached)),
        }
    }

    fn fallback(cached: Option<CachedTrack>) -> NowPlaying {
        match cached {
            Some(stale) => {
                warn!("nothing reported as playing; serving stale cached track");
                NowPlaying::Playing(stale.data)
            }
            None => {
                debug!("nothing playing");
                NowPlaying::NotPlaying
            }
        }
    }
}
