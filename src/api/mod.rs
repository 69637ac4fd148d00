//! Outbound calls to the Spotify accounts and Web API hosts.
pub mod spotify;
pub mod spotify_auth;

/// Shared HTTP client for both provider hosts. No timeout or retry is
/// configured; a failed call surfaces immediately.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::new()
}
