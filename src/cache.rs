use crate::config::{Config, KvKeys};
use crate::models::{CachedTrack, TrackInfo};
use crate::store::KvStore;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, warn};

/// Last known track plus the time it was written, stored under two keys.
///
/// Reads classify the entry by age: younger than `fresh_ttl_ms` is fresh,
/// younger than `stale_ttl_ms` is stale, anything older is treated as absent
/// even though the value is still physically in the store.
pub struct TrackCache {
    store: Arc<dyn KvStore>,
    keys: KvKeys,
    fresh_ttl_ms: i64,
    stale_ttl_ms: i64,
}

impl TrackCache {
    pub fn new(cfg: &Config, store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            keys: cfg.keys.clone(),
            fresh_ttl_ms: cfg.fresh_ttl_ms,
            stale_ttl_ms: cfg.stale_ttl_ms,
        }
    }

    pub async fn read(&self, now_ms: i64) -> Result<Option<CachedTrack>> {
        let song = self.store.get(&self.keys.song_cache).await?;
        let timestamp = self.store.get(&self.keys.song_cache_timestamp).await?;
        let (song, timestamp) = match (song, timestamp) {
            (Some(s), Some(t)) => (s, t),
            _ => return Ok(None),
        };

        let written_at: i64 = match timestamp.trim().parse() {
            Ok(t) => t,
            Err(_) => {
                warn!("cached track timestamp {:?} is not a number; ignoring cache", timestamp);
                return Ok(None);
            }
        };

        let age = match now_ms.checked_sub(written_at) {
            Some(a) => a,
            None => {
                warn!("cached track timestamp {} is out of range; ignoring cache", written_at);
                return Ok(None);
            }
        };
        let is_fresh = if age < self.fresh_ttl_ms {
            true
        } else if age < self.stale_ttl_ms {
            false
        } else {
            debug!(age_ms = age, "cached track expired");
            return Ok(None);
        };

        match serde_json::from_str::<TrackInfo>(&song) {
            Ok(data) => {
                debug!(age_ms = age, is_fresh, "cache hit");
                Ok(Some(CachedTrack { data, is_fresh }))
            }
            Err(e) => {
                warn!("cached track payload is unreadable ({}); ignoring cache", e);
                Ok(None)
            }
        }
    }

    /// Two independent writes, payload first; the pair is not written atomically.
    pub async fn write(&self, track: &TrackInfo, now_ms: i64) -> Result<()> {
        let json = serde_json::to_string(track)?;
        self.store.put(&self.keys.song_cache, &json).await?;
        self.store
            .put(&self.keys.song_cache_timestamp, &now_ms.to_string())
            .await?;
        Ok(())
    }
}
