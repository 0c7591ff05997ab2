use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid namespace name: {0:?}")]
    InvalidNamespace(String),

    #[error("Corrupt entry {key:?} in {namespace}: {reason}")]
    Corrupt {
        namespace: String,
        key: String,
        reason: String,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;
