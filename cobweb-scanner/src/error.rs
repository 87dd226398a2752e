use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid seed URL '{url}': {reason}")]
    InvalidSeedUrl { url: String, reason: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("link failed")]
    LinkFailed,

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Worker pool error: {0}")]
    Pool(#[from] PoolError),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    #[error("worker pool has been shut down")]
    ShutDown,
}

pub type Result<T> = std::result::Result<T, ScanError>;
