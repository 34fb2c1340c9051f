//! Core domain types for the bitdash market dashboard.
//!
//! This crate provides the types shared by every other crate:
//! - `Price`, `Size`: Precision-safe numeric types
//! - `TickerSnapshot` / `TickerUpdate`: spot ticker state and its streaming delta
//! - `OrderBookSnapshot`: full-replacement depth snapshot
//! - `FuturesRow`, `Symbol`, `NewsItem`: display rows
//! - `format`: magnitude-suffixed number formatting and percentage change

pub mod decimal;
pub mod error;
pub mod format;
pub mod types;

pub use decimal::{parse_decimal, Price, Size};
pub use error::{CoreError, Result};
pub use format::{fmt, fmt_decimal, fmt_str, instrument_label, pct};
pub use types::{
    BookLevel, FuturesRow, NewsItem, OrderBookSnapshot, Symbol, TickerSnapshot, TickerUpdate,
};
