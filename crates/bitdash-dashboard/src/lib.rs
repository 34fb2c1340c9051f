//! bitdash-dashboard - Browser view of the market dashboard.
//!
//! All reshaping of market data into display rows happens here; the static
//! page only paints what it receives.
//!
//! - `GET /`             static HTML page
//! - `GET /api/snapshot` full view model as JSON
//! - `POST /api/select`  change the selected instrument
//! - `GET /api/news`     server-side RSS passthrough
//! - `GET /metrics`      prometheus exposition
//! - `GET /ws`           initial snapshot, then periodic updates
//!
//! # Usage
//!
//! ```ignore
//! use bitdash_dashboard::{run_server, DashboardConfig, DashboardState};
//!
//! let state = DashboardState::new(market_state, selection_tx, news, "_UMCBL");
//! tokio::spawn(run_server(state, DashboardConfig::default(), shutdown));
//! ```

mod broadcast;
mod config;
mod server;
mod state;
mod types;
pub mod view;

pub use config::DashboardConfig;
pub use server::{create_router, run_server, serve, AppState};
pub use state::{DashboardState, SelectionError};
pub use types::{
    DashboardMessage, DashboardSnapshot, DepthCard, DepthLevelView, Direction, FuturesRowView,
    PriceCard, SelectorCard, SymbolRowView,
};
