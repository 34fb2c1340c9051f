//! Bitget market dashboard.
//!
//! Main application that wires all components together:
//! - REST polling of spot and futures tickers
//! - Streaming ticker and order book of the selected instrument
//! - One-shot news fetch
//! - Dashboard HTTP/WebSocket server

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
