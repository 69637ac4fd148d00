use crate::models::{CurrentlyPlaying, TrackInfo};

/// Map a currently-playing payload to the caller-facing track.
///
/// Returns `None` ("treat as nothing playing") when there is no payload, no
/// item, playback is paused, or the item is not a track (e.g. an episode).
pub fn format_track(payload: Option<&CurrentlyPlaying>) -> Option<TrackInfo> {
    let payload = payload?;
    let item = payload.item.as_ref()?;
    if !payload.is_playing || payload.currently_playing_type.as_deref() != Some("track") {
        return None;
    }

    let artist = item
        .artists
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let (album, album_image_url) = match &item.album {
        Some(album) => (
            album.name.clone(),
            album.images.first().map(|i| i.url.clone()).unwrap_or_default(),
        ),
        None => (String::new(), String::new()),
    };

    Some(TrackInfo {
        title: item.name.clone(),
        artist,
        album,
        album_image_url,
        url: item.external_urls.spotify.clone(),
        is_playing: true,
    })
}
