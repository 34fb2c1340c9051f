//! Market data for the bitdash dashboard.
//!
//! Combines REST polls and per-channel WebSocket streams into one
//! `MarketState`:
//! - `MarketDataClient`: symbol listing, ticker/futures polls, ticker and book streams
//! - `MarketState`: shared state read by the view
//! - `SelectionController`: owns the live subscriptions of the selected instrument

pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod market_state;
pub mod parser;

pub use client::{BookStream, MarketDataClient, TickerStream};
pub use config::MarketConfig;
pub use controller::SelectionController;
pub use error::{FeedError, FeedResult};
pub use market_state::{MarketState, StreamStatus};
pub use parser::MessageParser;
