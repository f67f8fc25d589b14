use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("remote store responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("remote store is not configured")]
    NotConfigured,
}

pub type StoreResult<T> = Result<T, StoreError>;
