use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Spotify application client id used for the refresh grant.
    #[serde(default)]
    pub client_id: String,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    // path to database file backing the key-value store
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    // Provider endpoints; tests point these at a mock server.
    #[serde(default = "default_auth_base")]
    pub auth_base: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,

    // Cache / token timing, all in milliseconds
    #[serde(default = "default_fresh_ttl")]
    pub fresh_ttl_ms: i64,
    #[serde(default = "default_stale_ttl")]
    pub stale_ttl_ms: i64,
    #[serde(default = "default_refresh_buffer")]
    pub token_refresh_buffer_ms: i64,

    #[serde(default)]
    pub keys: KvKeys,
}

/// Names of the three keys the proxy owns in the key-value store.
#[derive(Debug, Deserialize, Clone)]
pub struct KvKeys {
    #[serde(default = "default_token_key")]
    pub token: String,
    #[serde(default = "default_song_cache_key")]
    pub song_cache: String,
    #[serde(default = "default_song_cache_timestamp_key")]
    pub song_cache_timestamp: String,
}

fn default_listen_addr() -> String { "127.0.0.1:8787".into() }
fn default_db_path() -> PathBuf { "/var/lib/now-playing/now-playing.db".into() }
fn default_log_dir() -> PathBuf { "/var/log/now-playing".into() }
fn default_auth_base() -> String { "https://accounts.spotify.com".into() }
fn default_api_base() -> String { "https://api.spotify.com/v1".into() }
fn default_fresh_ttl() -> i64 { 20 * 1000 }
fn default_stale_ttl() -> i64 { 20 * 60 * 1000 }
fn default_refresh_buffer() -> i64 { 5 * 60 * 1000 }
fn default_token_key() -> String { "spotify_token".into() }
fn default_song_cache_key() -> String { "spotify_song_cache".into() }
fn default_song_cache_timestamp_key() -> String { "spotify_song_cache_timestamp".into() }

impl Default for KvKeys {
    fn default() -> Self {
        Self {
            token: default_token_key(),
            song_cache: default_song_cache_key(),
            song_cache_timestamp: default_song_cache_timestamp_key(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            listen_addr: default_listen_addr(),
            db_path: default_db_path(),
            log_dir: default_log_dir(),
            auth_base: default_auth_base(),
            api_base: default_api_base(),
            fresh_ttl_ms: default_fresh_ttl(),
            stale_ttl_ms: default_stale_ttl(),
            token_refresh_buffer_ms: default_refresh_buffer(),
            keys: KvKeys::default(),
        }
    }
}

impl Config {
    pub fn from_path(path: &std::path::Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&s)?;
        Ok(cfg)
    }

    pub fn token_url(&self) -> String {
        format!("{}/api/token", self.auth_base.trim_end_matches('/'))
    }

    pub fn now_playing_url(&self) -> String {
        format!(
            "{}/me/player/currently-playing",
            self.api_base.trim_end_matches('/')
        )
    }

    /// Must run before the rolling file appender is built.
    pub fn ensure_log_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.log_dir)
            .with_context(|| format!("creating log dir {}", self.log_dir.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(anyhow!("client_id is empty (set it in the config or SPOTIFY_CLIENT_ID)"));
        }
        if self.fresh_ttl_ms <= 0 {
            return Err(anyhow!("fresh_ttl_ms must be positive"));
        }
        if self.stale_ttl_ms <= self.fresh_ttl_ms {
            return Err(anyhow!(
                "stale_ttl_ms ({}) must be greater than fresh_ttl_ms ({})",
                self.stale_ttl_ms,
                self.fresh_ttl_ms
            ));
        }
        if self.token_refresh_buffer_ms < 0 {
            return Err(anyhow!("token_refresh_buffer_ms must not be negative"));
        }
        Ok(())
    }
}
