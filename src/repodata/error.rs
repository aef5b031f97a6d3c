use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("no repodata published for {channel}/{platform}")]
    ChannelNotFound { channel: String, platform: String },

    #[error("repodata request for {channel}/{platform} returned status {status}")]
    Status {
        channel: String,
        platform: String,
        status: reqwest::StatusCode,
    },

    #[error("cache error: {0}")]
    Cache(#[from] std::io::Error),

    #[error("invalid repodata index: {0}")]
    InvalidIndex(#[from] serde_json::Error),
}
