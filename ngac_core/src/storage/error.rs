use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid record location: {0}")]
    InvalidLocation(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("Storage error: {0}")]
    Other(String),
}
