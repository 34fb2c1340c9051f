//! WebSocket error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WsError {
    #[error("Connection closed: code={code}, reason={reason}")]
    ConnectionClosed { code: u16, reason: String },

    #[error("Message parse error: {0}")]
    ParseError(String),

    #[error("Subscription error: {0}")]
    SubscriptionError(String),

    #[error("Heartbeat timeout")]
    HeartbeatTimeout,

    #[error("Message receiver dropped")]
    ReceiverDropped,

    #[error("Tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type WsResult<T> = Result<T, WsError>;
