//! Market data client.
//!
//! REST data is delivered as restartable interval streams; streaming data as
//! per-subscription [`TickerStream`] / [`BookStream`], each owning its own
//! WebSocket connection. Failures never surface to callers: a failed fetch
//! yields nothing for its tick and a malformed or foreign stream message is
//! dropped.

use bitdash_core::{FuturesRow, OrderBookSnapshot, Symbol, TickerSnapshot, TickerUpdate};
use bitdash_rest::{poll, MarketClient};
use bitdash_telemetry::Metrics;
use bitdash_ws::{Channel, ChannelSubscription, DataMessage, StreamConfig, SubscriptionTracker};
use futures_util::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::MarketConfig;
use crate::error::FeedResult;
use crate::market_state::MarketState;
use crate::parser::MessageParser;

/// Market data client.
pub struct MarketDataClient {
    rest: Arc<MarketClient>,
    config: MarketConfig,
    stream: StreamConfig,
}

impl MarketDataClient {
    pub fn new(config: MarketConfig, stream: StreamConfig) -> FeedResult<Self> {
        let rest = Arc::new(MarketClient::new(config.rest_url.clone())?);
        Ok(Self {
            rest,
            config,
            stream,
        })
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    pub fn stream_config(&self) -> &StreamConfig {
        &self.stream
    }

    /// List symbols quoted in the configured coin. Failure yields an empty list.
    pub async fn list_symbols(&self) -> Vec<Symbol> {
        match self.rest.list_symbols(&self.config.quote_coin).await {
            Ok(symbols) => {
                info!(count = symbols.len(), quote = %self.config.quote_coin, "Listed symbols");
                symbols
            }
            Err(e) => {
                warn!(error = %e, "Symbol listing failed");
                Vec::new()
            }
        }
    }

    /// Poll spot tickers. Each item is the complete collection.
    pub fn poll_tickers(
        &self,
        interval: Duration,
    ) -> impl Stream<Item = Vec<TickerSnapshot>> + Send + 'static {
        let rest = self.rest.clone();
        poll("spot_tickers", interval, move || {
            let rest = rest.clone();
            async move { rest.fetch_spot_tickers().await }
        })
    }

    /// Poll futures tickers of the configured product type.
    pub fn poll_futures(
        &self,
        interval: Duration,
    ) -> impl Stream<Item = Vec<FuturesRow>> + Send + 'static {
        let rest = self.rest.clone();
        let product_type = self.config.product_type.clone();
        poll("futures_tickers", interval, move || {
            let rest = rest.clone();
            let product_type = product_type.clone();
            async move { rest.fetch_futures_tickers(&product_type).await }
        })
    }

    /// Subscribe to the ticker channel of `symbol`.
    pub fn subscribe_ticker(&self, symbol: &str) -> TickerStream {
        let (subscription, rx) = ChannelSubscription::open(&self.stream, Channel::Ticker, symbol);
        TickerStream {
            symbol: symbol.to_string(),
            subscription,
            rx,
        }
    }

    /// Subscribe to the books channel of `symbol`.
    pub fn subscribe_order_book(&self, symbol: &str) -> BookStream {
        let (subscription, rx) = ChannelSubscription::open(&self.stream, Channel::Books, symbol);
        BookStream {
            symbol: symbol.to_string(),
            subscription,
            rx,
        }
    }

    /// Keep `state`'s tickers collection in sync until cancelled.
    pub async fn sync_tickers(&self, state: Arc<MarketState>, cancel: CancellationToken) {
        let mut stream = Box::pin(self.poll_tickers(self.config.ticker_interval()));
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                item = stream.next() => match item {
                    Some(tickers) => state.replace_tickers(tickers),
                    None => break,
                },
            }
        }
        debug!("Ticker sync stopped");
    }

    /// Keep `state`'s futures rows in sync until cancelled.
    pub async fn sync_futures(&self, state: Arc<MarketState>, cancel: CancellationToken) {
        let mut stream = Box::pin(self.poll_futures(self.config.futures_interval()));
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                item = stream.next() => match item {
                    Some(rows) => state.replace_futures(rows),
                    None => break,
                },
            }
        }
        debug!("Futures sync stopped");
    }
}

/// Stream of ticker updates for one symbol, owning its connection.
#[derive(Debug)]
pub struct TickerStream {
    symbol: String,
    subscription: ChannelSubscription,
    rx: mpsc::Receiver<DataMessage>,
}

impl TickerStream {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn tracker(&self) -> Arc<SubscriptionTracker> {
        self.subscription.tracker()
    }

    /// Close the connection and wait for it to finish.
    pub async fn close(&mut self) {
        self.subscription.close().await;
    }

    fn accept(&self, msg: &DataMessage) -> Option<TickerUpdate> {
        match MessageParser::parse_ticker(msg) {
            Ok(update) if update.symbol == self.symbol => Some(update),
            Ok(update) => {
                debug!(symbol = %update.symbol, subscribed = %self.symbol, "Dropping foreign ticker");
                Metrics::stream_dropped(Channel::Ticker.as_str(), "foreign");
                None
            }
            Err(e) => {
                warn!(symbol = %self.symbol, error = %e, "Dropping unparseable ticker");
                Metrics::stream_dropped(Channel::Ticker.as_str(), "parse");
                None
            }
        }
    }
}

impl Stream for TickerStream {
    type Item = TickerUpdate;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match this.rx.poll_recv(cx) {
                Poll::Ready(Some(msg)) => {
                    if let Some(update) = this.accept(&msg) {
                        return Poll::Ready(Some(update));
                    }
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Stream of full order book snapshots for one symbol, owning its connection.
#[derive(Debug)]
pub struct BookStream {
    symbol: String,
    subscription: ChannelSubscription,
    rx: mpsc::Receiver<DataMessage>,
}

impl BookStream {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn tracker(&self) -> Arc<SubscriptionTracker> {
        self.subscription.tracker()
    }

    /// Close the connection and wait for it to finish.
    pub async fn close(&mut self) {
        self.subscription.close().await;
    }

    fn accept(&self, msg: &DataMessage) -> Option<OrderBookSnapshot> {
        if msg.arg.inst_id != self.symbol {
            Metrics::stream_dropped(Channel::Books.as_str(), "foreign");
            return None;
        }
        match MessageParser::parse_book(msg) {
            Ok(book) => Some(book),
            Err(e) => {
                warn!(symbol = %self.symbol, error = %e, "Dropping unparseable book");
                Metrics::stream_dropped(Channel::Books.as_str(), "parse");
                None
            }
        }
    }
}

impl Stream for BookStream {
    type Item = OrderBookSnapshot;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match this.rx.poll_recv(cx) {
                Poll::Ready(Some(msg)) => {
                    if let Some(book) = this.accept(&msg) {
                        return Poll::Ready(Some(book));
                    }
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
