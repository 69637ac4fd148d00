use thiserror::Error;

/// Failures on the request path. Each variant maps to exactly one HTTP status.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// No stored token, or the provider rejected the refresh grant.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// The now-playing call returned a non-2xx status other than 204.
    #[error("Spotify API error: {status}")]
    UpstreamApi { status: u16 },
    #[error(transparent)]
    Uncategorized(#[from] anyhow::Error),
}

impl ProxyError {
    pub fn status_code(&self) -> u16 {
        match self {
            ProxyError::Authentication(_) => 401,
            ProxyError::UpstreamApi { .. } => 503,
            ProxyError::Uncategorized(_) => 500,
        }
    }

    /// Message placed in the `error` field of the response body.
    pub fn public_message(&self) -> String {
        match self {
            ProxyError::Authentication(_) | ProxyError::UpstreamApi { .. } => self.to_string(),
            ProxyError::Uncategorized(_) => "Failed to fetch data".into(),
        }
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(e: reqwest::Error) -> Self {
        ProxyError::Uncategorized(e.into())
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(e: serde_json::Error) -> Self {
        ProxyError::Uncategorized(e.into())
    }
}
