use serde::{Deserialize, Serialize};

/// OAuth credential pair as persisted under the token key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    // epoch millis; older blobs call it `expires`
    #[serde(default, alias = "expires")]
    pub expires_at: i64,
}

impl AccessToken {
    /// True while `now` is still outside the refresh buffer before `expires_at`.
    pub fn is_usable_at(&self, now_ms: i64, buffer_ms: i64) -> bool {
        now_ms < self.expires_at.saturating_sub(buffer_ms)
    }
}

fn default_token_type() -> String {
    "Bearer".into()
}

/// Caller-facing snapshot of the track currently playing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub album_image_url: String,
    pub url: String,
    pub is_playing: bool,
}

/// Result of a cache read: the stored track and whether it is inside the fresh window.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedTrack {
    pub data: TrackInfo,
    pub is_fresh: bool,
}

/// Body of `GET /me/player/currently-playing`. Only the fields we read are modelled.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CurrentlyPlaying {
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub currently_playing_type: Option<String>,
    #[serde(default)]
    pub item: Option<PlayingItem>,
}

/// Either a track or an episode; episode-only fields are ignored, track fields default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayingItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub album: Option<Album>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Artist {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Image {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalUrls {
    #[serde(default)]
    pub spotify: String,
}
