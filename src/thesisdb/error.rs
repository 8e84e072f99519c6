use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Timed out after {waited:?} waiting for lock on {}", resource.display())]
    LockTimeout { resource: PathBuf, waited: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] confique::Error),

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Record is missing key field: {0}")]
    MissingKey(String),

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("{0} is valid JSON but not the expected shape; fix it or run `recover`")]
    ShapeMismatch(String),

    #[error("Invalid attachment: {0}")]
    InvalidAttachment(String),
}

impl StoreError {
    /// True when the operation never started and can simply be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::LockTimeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
