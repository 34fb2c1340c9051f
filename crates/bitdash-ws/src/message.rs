//! WebSocket message types.
//!
//! Outgoing: `{"op":"subscribe","args":[{"instType":"SPOT","channel":"ticker","instId":"BTCUSDT"}]}`
//! and the literal text `ping`.
//!
//! Incoming:
//! - `pong` (literal text)
//! - events: `{"event":"subscribe","arg":{..}}`, `{"event":"error","code":30001,"msg":".."}`
//! - data: `{"action":"snapshot","arg":{..},"data":[..],"ts":..}`

use serde::{Deserialize, Serialize};

use crate::error::{WsError, WsResult};

/// Heartbeat request text.
pub const PING: &str = "ping";
/// Heartbeat response text.
pub const PONG: &str = "pong";

/// Public channels used by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// 24h ticker.
    Ticker,
    /// Order book depth.
    Books,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ticker => "ticker",
            Self::Books => "books",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscription argument, identifying one channel of one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionArg {
    /// Instrument type (e.g., "SPOT"). Omitted when not configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inst_type: Option<String>,
    pub channel: String,
    pub inst_id: String,
}

impl SubscriptionArg {
    pub fn new(inst_type: Option<String>, channel: Channel, inst_id: impl Into<String>) -> Self {
        Self {
            inst_type,
            channel: channel.as_str().to_string(),
            inst_id: inst_id.into(),
        }
    }

    /// Check whether an incoming arg addresses the same channel and instrument.
    ///
    /// `instType` is ignored: the server echoes it in its own casing.
    pub fn matches(&self, other: &SubscriptionArg) -> bool {
        self.channel == other.channel && self.inst_id == other.inst_id
    }
}

impl std::fmt::Display for SubscriptionArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.channel, self.inst_id)
    }
}

/// Outgoing request.
#[derive(Debug, Clone, Serialize)]
pub struct WsRequest {
    pub op: String,
    pub args: Vec<SubscriptionArg>,
}

impl WsRequest {
    /// Create a subscribe request.
    pub fn subscribe(args: Vec<SubscriptionArg>) -> Self {
        Self {
            op: "subscribe".to_string(),
            args,
        }
    }
}

/// Event frame (subscription ack or error).
#[derive(Debug, Clone, Deserialize)]
pub struct EventMessage {
    pub event: String,
    #[serde(default)]
    pub arg: Option<SubscriptionArg>,
    /// Error code; the server sends it as either a number or a string.
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    #[serde(default)]
    pub msg: Option<String>,
}

impl EventMessage {
    pub fn is_subscribe_ack(&self) -> bool {
        self.event == "subscribe"
    }

    pub fn is_error(&self) -> bool {
        self.event == "error"
    }
}

/// Data frame.
#[derive(Debug, Clone, Deserialize)]
pub struct DataMessage {
    /// "snapshot" or "update".
    #[serde(default)]
    pub action: Option<String>,
    pub arg: SubscriptionArg,
    pub data: Vec<serde_json::Value>,
    #[serde(default)]
    pub ts: Option<i64>,
}

/// Parsed incoming frame.
#[derive(Debug, Clone)]
pub enum WsMessage {
    Pong,
    Event(EventMessage),
    Data(DataMessage),
}

impl WsMessage {
    /// Parse a text frame.
    pub fn parse(text: &str) -> WsResult<Self> {
        if text.trim() == PONG {
            return Ok(Self::Pong);
        }

        let value: serde_json::Value = serde_json::from_str(text)?;
        if value.get("event").is_some() {
            Ok(Self::Event(serde_json::from_value(value)?))
        } else if value.get("data").is_some() {
            Ok(Self::Data(serde_json::from_value(value)?))
        } else {
            Err(WsError::ParseError(format!(
                "unrecognized frame: {}",
                truncate(text, 120)
            )))
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
