//! Feed error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("REST error: {0}")]
    Rest(#[from] bitdash_rest::RestError),

    #[error("Core error: {0}")]
    Core(#[from] bitdash_core::CoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type FeedResult<T> = Result<T, FeedError>;
