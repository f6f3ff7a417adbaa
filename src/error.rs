use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} responded with status {status}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("Invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid API URL: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Thread store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Thread store JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Message text is empty")]
    EmptyMessage,

    /// The stream could not be opened or its body failed mid-read.
    #[error("Failed to connect to stream: {0}")]
    Connection(#[source] ApiError),

    #[error("Failed to load thread history: {0}")]
    HistoryFetch(#[source] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum QuizError {
    #[error("Step {0} is incomplete")]
    Incomplete(u8),

    #[error(transparent)]
    Api(#[from] ApiError),
}
