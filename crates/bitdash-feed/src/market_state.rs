//! Shared market state.
//!
//! Written by the pollers and the selection's stream forwarders, read by the
//! view. Each collection has a single writer; the selected instrument's
//! ticker and book live under one lock with the selection itself so a
//! generation check and the write it guards cannot interleave with `select`.

use bitdash_core::{FuturesRow, NewsItem, OrderBookSnapshot, Symbol, TickerSnapshot, TickerUpdate};
use bitdash_ws::{SubscriptionStatus, SubscriptionTracker};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, trace};

/// Selected instrument and the state scoped to it.
#[derive(Debug, Default)]
struct Selection {
    symbol: Option<String>,
    /// Bumped on every selection change.
    generation: u64,
    ticker: Option<TickerSnapshot>,
    book: OrderBookSnapshot,
}

/// Status of one live stream, as shown by the view.
#[derive(Debug, Clone, Serialize)]
pub struct StreamStatus {
    pub channel: String,
    #[serde(flatten)]
    pub status: SubscriptionStatus,
}

/// Aggregated market state.
#[derive(Debug, Default)]
pub struct MarketState {
    symbols: RwLock<Option<Vec<Symbol>>>,
    tickers: RwLock<Vec<TickerSnapshot>>,
    selection: RwLock<Selection>,
    futures: RwLock<Vec<FuturesRow>>,
    news: RwLock<Vec<NewsItem>>,
    streams: RwLock<Vec<Arc<SubscriptionTracker>>>,
}

impl MarketState {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- symbols ----

    pub fn set_symbols(&self, symbols: Vec<Symbol>) {
        debug!(count = symbols.len(), "Symbols loaded");
        *self.symbols.write() = Some(symbols);
    }

    /// Listed symbols (empty until loaded).
    pub fn symbols(&self) -> Vec<Symbol> {
        self.symbols.read().clone().unwrap_or_default()
    }

    /// Whether `symbol` is listed. `None` while the list is not loaded or is empty.
    pub fn is_listed(&self, symbol: &str) -> Option<bool> {
        match self.symbols.read().as_ref() {
            Some(symbols) if !symbols.is_empty() => {
                Some(symbols.iter().any(|s| s.symbol == symbol))
            }
            _ => None,
        }
    }

    // ---- tickers collection ----

    /// Replace the whole tickers collection and re-resolve the selected snapshot.
    ///
    /// When the selected symbol has no row, the selected snapshot keeps its
    /// streamed fields.
    pub fn replace_tickers(&self, tickers: Vec<TickerSnapshot>) {
        let mut collection = self.tickers.write();
        *collection = tickers;

        let mut selection = self.selection.write();
        if let Some(symbol) = selection.symbol.as_deref() {
            if let Some(row) = collection.iter().find(|t| t.symbol == symbol) {
                selection.ticker = Some(row.clone());
            }
        }
        trace!(count = collection.len(), "Tickers replaced");
    }

    pub fn tickers(&self) -> Vec<TickerSnapshot> {
        self.tickers.read().clone()
    }

    pub fn ticker(&self, symbol: &str) -> Option<TickerSnapshot> {
        self.tickers
            .read()
            .iter()
            .find(|t| t.symbol == symbol)
            .cloned()
    }

    // ---- selection ----

    /// Select an instrument. Clears the order book, resolves the snapshot from
    /// the tickers collection and returns the new generation.
    pub fn select(&self, symbol: &str) -> u64 {
        let row = self.ticker(symbol);
        let mut selection = self.selection.write();
        selection.symbol = Some(symbol.to_string());
        selection.generation += 1;
        selection.ticker = row;
        selection.book = OrderBookSnapshot::default();
        debug!(symbol, generation = selection.generation, "Selection changed");
        selection.generation
    }

    pub fn selected_symbol(&self) -> Option<String> {
        self.selection.read().symbol.clone()
    }

    pub fn generation(&self) -> u64 {
        self.selection.read().generation
    }

    /// Check whether `(symbol, generation)` is still the live selection.
    pub fn is_current(&self, symbol: &str, generation: u64) -> bool {
        let selection = self.selection.read();
        selection.generation == generation && selection.symbol.as_deref() == Some(symbol)
    }

    /// Snapshot of the selected instrument.
    pub fn spot_ticker(&self) -> Option<TickerSnapshot> {
        self.selection.read().ticker.clone()
    }

    /// Merge a streaming ticker update into the selected snapshot.
    ///
    /// Ignored unless `generation` is current and the update is for the
    /// selected symbol. Returns whether the snapshot changed.
    pub fn apply_ticker_update(&self, generation: u64, update: &TickerUpdate) -> bool {
        let mut selection = self.selection.write();
        if selection.generation != generation {
            trace!(generation, current = selection.generation, "Stale ticker update");
            return false;
        }
        let Some(symbol) = selection.symbol.clone() else {
            return false;
        };
        if update.symbol != symbol {
            trace!(symbol = %update.symbol, selected = %symbol, "Foreign ticker update");
            return false;
        }

        selection
            .ticker
            .get_or_insert_with(|| TickerSnapshot::empty(symbol))
            .apply(update)
    }

    /// Replace the selected instrument's order book.
    ///
    /// Ignored unless `(symbol, generation)` is the live selection.
    pub fn replace_book(&self, generation: u64, symbol: &str, book: OrderBookSnapshot) -> bool {
        let mut selection = self.selection.write();
        if selection.generation != generation || selection.symbol.as_deref() != Some(symbol) {
            trace!(symbol, generation, "Stale book update");
            return false;
        }
        selection.book = book;
        true
    }

    pub fn book(&self) -> OrderBookSnapshot {
        self.selection.read().book.clone()
    }

    // ---- futures ----

    pub fn replace_futures(&self, rows: Vec<FuturesRow>) {
        trace!(count = rows.len(), "Futures replaced");
        *self.futures.write() = rows;
    }

    pub fn futures(&self) -> Vec<FuturesRow> {
        self.futures.read().clone()
    }

    /// Futures rows ranked by quote volume, at most `limit`.
    pub fn ranked_futures(&self, limit: usize) -> Vec<FuturesRow> {
        FuturesRow::rank_by_volume(&self.futures.read(), limit)
    }

    // ---- news ----

    pub fn set_news(&self, items: Vec<NewsItem>) {
        *self.news.write() = items;
    }

    pub fn news(&self) -> Vec<NewsItem> {
        self.news.read().clone()
    }

    // ---- stream status ----

    /// Replace the trackers of the live subscriptions.
    pub fn set_streams(&self, trackers: Vec<Arc<SubscriptionTracker>>) {
        *self.streams.write() = trackers;
    }

    pub fn stream_statuses(&self) -> Vec<StreamStatus> {
        self.streams
            .read()
            .iter()
            .map(|tracker| StreamStatus {
                channel: tracker.channel().to_string(),
                status: tracker.status(),
            })
            .collect()
    }
}
