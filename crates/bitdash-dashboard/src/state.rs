//! Dashboard state management.
//!
//! DashboardState is the view's handle on the rest of the process: it reads
//! `MarketState`, forwards selection requests to the selection controller and
//! reaches the news feed for the passthrough endpoint.

use std::sync::Arc;

use bitdash_feed::MarketState;
use bitdash_rest::{NewsFetcher, RestResult};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use crate::types::DashboardSnapshot;
use crate::view;

/// Rejected selection request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("symbol is empty")]
    Empty,

    #[error("unknown symbol: {0}")]
    Unknown(String),

    #[error("selection controller is not running")]
    Unavailable,
}

/// Dashboard state shared by all handlers.
#[derive(Clone)]
pub struct DashboardState {
    market: Arc<MarketState>,
    selection_tx: mpsc::Sender<String>,
    news: Arc<NewsFetcher>,
    contract_suffix: Arc<str>,
}

impl DashboardState {
    pub fn new(
        market: Arc<MarketState>,
        selection_tx: mpsc::Sender<String>,
        news: Arc<NewsFetcher>,
        contract_suffix: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            market,
            selection_tx,
            news,
            contract_suffix: contract_suffix.into(),
        }
    }

    pub fn market(&self) -> &Arc<MarketState> {
        &self.market
    }

    /// Render the current view model.
    pub fn collect_snapshot(&self) -> DashboardSnapshot {
        view::render_snapshot(&self.market, &self.contract_suffix)
    }

    /// Validate and forward a selection request.
    ///
    /// Unknown symbols are rejected only once the symbol list is loaded.
    pub async fn request_selection(&self, symbol: &str) -> Result<String, SelectionError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(SelectionError::Empty);
        }
        if self.market.is_listed(&symbol) == Some(false) {
            return Err(SelectionError::Unknown(symbol));
        }

        debug!(symbol = %symbol, "Selection requested");
        self.selection_tx
            .send(symbol.clone())
            .await
            .map_err(|_| SelectionError::Unavailable)?;
        Ok(symbol)
    }

    /// Raw RSS document for the passthrough endpoint.
    pub async fn fetch_news_feed(&self) -> RestResult<String> {
        self.news.fetch_raw_feed().await
    }
}
