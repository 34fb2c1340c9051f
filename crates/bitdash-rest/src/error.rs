//! REST error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RestError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("HTTP {status} from {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("API error {code}: {msg}")]
    Api { code: String, msg: String },

    #[error("RSS parse error: {0}")]
    Rss(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type RestResult<T> = Result<T, RestError>;
