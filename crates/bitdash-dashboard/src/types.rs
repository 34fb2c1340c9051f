//! Dashboard API types.
//!
//! These types are used for JSON serialization in REST and WebSocket APIs.
//! Every value is pre-formatted for display.

use bitdash_core::NewsItem;
use bitdash_feed::StreamStatus;
use serde::Serialize;

/// Full dashboard view model (sent on initial connection and via REST).
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    /// Timestamp when snapshot was taken (Unix milliseconds).
    pub timestamp_ms: i64,
    pub selector: SelectorCard,
    pub price: PriceCard,
    /// Top futures by quote volume.
    pub futures: Vec<FuturesRowView>,
    pub depth: DepthCard,
    /// Symbol table (capped).
    pub symbols: Vec<SymbolRowView>,
    pub news: Vec<NewsItem>,
    /// Per-channel stream status of the selection.
    pub streams: Vec<StreamStatus>,
}

/// Instrument selector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectorCard {
    pub selected: Option<String>,
    pub symbols: Vec<String>,
}

/// Price direction flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Zero counts as up.
    pub fn of(change: f64) -> Self {
        if change >= 0.0 {
            Self::Up
        } else {
            Self::Down
        }
    }
}

/// Selected instrument price summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceCard {
    pub symbol: Option<String>,
    pub last: String,
    /// 24h change, percent, two decimals.
    pub change_pct: String,
    pub direction: Direction,
    pub high: String,
    pub low: String,
    pub base_volume: String,
    pub quote_volume: String,
}

/// Futures table row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuturesRowView {
    pub instrument_id: String,
    /// Id with the contract suffix stripped.
    pub label: String,
    pub last: String,
    pub change_pct: String,
    pub direction: Direction,
    pub volume: String,
}

/// One depth bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepthLevelView {
    pub price: String,
    pub size: String,
    /// Bar width in percent of the largest level, 0..=100.
    pub width_pct: f64,
}

/// Order book depth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepthCard {
    pub symbol: Option<String>,
    pub bids: Vec<DepthLevelView>,
    pub asks: Vec<DepthLevelView>,
    pub seq: Option<u64>,
    pub ts: Option<i64>,
}

/// Symbol table row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolRowView {
    pub symbol: String,
    pub min_trade_amount: String,
    pub maker_fee_rate: String,
    pub taker_fee_rate: String,
}

/// WebSocket message types (tagged enum for type safety).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardMessage {
    /// Full snapshot (sent on connect).
    Snapshot(DashboardSnapshot),
    /// Periodic update.
    Update {
        /// Update timestamp.
        timestamp_ms: i64,
        price: PriceCard,
        depth: DepthCard,
        futures: Vec<FuturesRowView>,
        streams: Vec<StreamStatus>,
        /// Selector (only when changed).
        #[serde(skip_serializing_if = "Option::is_none")]
        selector: Option<SelectorCard>,
        /// Symbol table (only when changed).
        #[serde(skip_serializing_if = "Option::is_none")]
        symbols: Option<Vec<SymbolRowView>>,
        /// News list (only when changed).
        #[serde(skip_serializing_if = "Option::is_none")]
        news: Option<Vec<NewsItem>>,
    },
}
