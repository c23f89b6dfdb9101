//! Store error types.

use snowball_common::SnowballError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid paper id: {0:?}")]
    InvalidId(String),

    #[error("Write-behind queue is closed")]
    WriterClosed,

    #[error("Background writer stopped unexpectedly")]
    WriterPanicked,

    #[error("{count} write(s) failed, first: {first}")]
    WriteFailed { count: usize, first: String },
}

impl From<DbError> for SnowballError {
    fn from(err: DbError) -> Self {
        SnowballError::Storage(err.to_string())
    }
}
