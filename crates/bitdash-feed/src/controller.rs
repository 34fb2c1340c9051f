//! Selection controller.
//!
//! Owns the ticker and books subscriptions of the selected instrument.
//! Changing the selection is close-then-open: the state is switched first
//! (clearing the book), the old forwarders are cancelled and awaited (which
//! closes their connections), and only then are the new subscriptions opened.
//! Forwarders write through `MarketState` with their captured generation, so
//! anything still in flight from a torn-down connection is discarded.

use bitdash_telemetry::Metrics;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{BookStream, MarketDataClient, TickerStream};
use crate::market_state::MarketState;

/// Live subscriptions of one selection.
struct ActiveSelection {
    symbol: String,
    generation: u64,
    cancel: CancellationToken,
    forwarders: Vec<JoinHandle<()>>,
}

/// Selection controller.
pub struct SelectionController {
    client: Arc<MarketDataClient>,
    state: Arc<MarketState>,
    active: Option<ActiveSelection>,
}

impl SelectionController {
    pub fn new(client: Arc<MarketDataClient>, state: Arc<MarketState>) -> Self {
        Self {
            client,
            state,
            active: None,
        }
    }

    /// Currently selected symbol, if subscriptions are live.
    pub fn active_symbol(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.symbol.as_str())
    }

    /// Switch the selection to `symbol`. Selecting the live symbol again is a no-op.
    pub async fn select(&mut self, symbol: &str) {
        if self.active_symbol() == Some(symbol) {
            debug!(symbol, "Already selected");
            return;
        }

        let generation = self.state.select(symbol);
        Metrics::selection_changed();
        info!(symbol, generation, "Selecting instrument");

        self.close_active().await;

        let ticker = self.client.subscribe_ticker(symbol);
        let book = self.client.subscribe_order_book(symbol);
        self.state.set_streams(vec![ticker.tracker(), book.tracker()]);

        let cancel = CancellationToken::new();
        let forwarders = vec![
            tokio::spawn(forward_ticker(
                ticker,
                self.state.clone(),
                generation,
                cancel.clone(),
            )),
            tokio::spawn(forward_book(
                book,
                self.state.clone(),
                symbol.to_string(),
                generation,
                cancel.clone(),
            )),
        ];

        self.active = Some(ActiveSelection {
            symbol: symbol.to_string(),
            generation,
            cancel,
            forwarders,
        });
    }

    /// Process selection requests until cancelled, then close the subscriptions.
    pub async fn run(mut self, mut requests: mpsc::Receiver<String>, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                request = requests.recv() => match request {
                    Some(symbol) => self.select(&symbol).await,
                    None => break,
                },
            }
        }
        self.shutdown().await;
    }

    /// Close the live subscriptions.
    pub async fn shutdown(&mut self) {
        self.close_active().await;
        self.state.set_streams(Vec::new());
    }

    async fn close_active(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        debug!(symbol = %active.symbol, generation = active.generation, "Closing subscriptions");
        active.cancel.cancel();
        for forwarder in active.forwarders {
            if let Err(e) = forwarder.await {
                warn!(symbol = %active.symbol, error = %e, "Forwarder task failed");
            }
        }
    }
}

async fn forward_ticker(
    mut stream: TickerStream,
    state: Arc<MarketState>,
    generation: u64,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            update = stream.next() => match update {
                Some(update) => {
                    state.apply_ticker_update(generation, &update);
                }
                None => break,
            },
        }
    }
    stream.close().await;
}

async fn forward_book(
    mut stream: BookStream,
    state: Arc<MarketState>,
    symbol: String,
    generation: u64,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            book = stream.next() => match book {
                Some(book) => {
                    state.replace_book(generation, &symbol, book);
                }
                None => break,
            },
        }
    }
    stream.close().await;
}
