//! REST access for the bitdash dashboard.
//!
//! - `MarketClient`: exchange public REST endpoints (symbols, spot and futures tickers)
//! - `poll`: turns a fallible fetch into an infinite interval stream
//! - `NewsFetcher`: RSS feed through a relay, with a static fallback list

pub mod client;
pub mod error;
pub mod news;
pub mod poller;

pub use client::MarketClient;
pub use error::{RestError, RestResult};
pub use news::{parse_rss, NewsConfig, NewsFetcher};
pub use poller::poll;
