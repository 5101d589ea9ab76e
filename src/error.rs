use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[cfg(feature = "network")]
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("network support is disabled")]
    NetworkDisabled,
}

pub type Result<T> = std::result::Result<T, Error>;
