use reqwest::StatusCode;

/// Fetching the page under scrape failed. Fatal to the owning task.
#[derive(Debug, thiserror::Error)]
pub enum PageFetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server responded with status {0}")]
    BadStatus(StatusCode),
}

/// Fetching one discovered image failed.
///
/// `InvalidUrl` is the only variant the download loop tolerates; a
/// `Transport` error aborts the whole task.
#[derive(Debug, thiserror::Error)]
pub enum ImageFetchError {
    #[error("invalid image url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::error::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    PageFetch(#[from] PageFetchError),

    #[error(transparent)]
    ImageFetch(#[from] ImageFetchError),
}
