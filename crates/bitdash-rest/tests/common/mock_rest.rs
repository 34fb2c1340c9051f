//! Mock exchange REST server for integration tests.
//!
//! Serves canned envelopes for the public endpoints and an RSS feed, and can
//! be switched into a failing mode to exercise degradation paths.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

pub const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Academy</title>
<item><title>First</title><link>https://example.com/1</link><pubDate>Mon, 01 Apr 2024 00:00:00 GMT</pubDate></item>
<item><title>Second</title><link>https://example.com/2</link></item>
</channel></rss>"#;

#[derive(Default)]
pub struct MockState {
    pub failing: AtomicBool,
    pub requests: AtomicUsize,
    /// `url` query parameter of the last relay request.
    pub last_feed_param: Mutex<Option<String>>,
}

pub struct MockRestServer {
    addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl MockRestServer {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/api/v2/spot/public/symbols", get(symbols))
            .route("/api/v2/spot/market/tickers", get(spot_tickers))
            .route("/api/v2/mix/market/tickers", get(futures_tickers))
            .route("/api/v2/error", get(api_error))
            .route("/relay", get(relay))
            .route("/rss.xml", get(feed))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api/v2", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }

    pub fn requests(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    pub fn last_feed_param(&self) -> Option<String> {
        self.state.last_feed_param.lock().unwrap().clone()
    }
}

fn guard(state: &MockState) -> Option<Response> {
    state.requests.fetch_add(1, Ordering::SeqCst);
    if state.failing.load(Ordering::SeqCst) {
        return Some(StatusCode::INTERNAL_SERVER_ERROR.into_response());
    }
    None
}

fn envelope(data: serde_json::Value) -> Response {
    Json(json!({
        "code": "00000",
        "msg": "success",
        "requestTime": 1700000000000i64,
        "data": data
    }))
    .into_response()
}

async fn symbols(State(state): State<Arc<MockState>>) -> Response {
    if let Some(resp) = guard(&state) {
        return resp;
    }
    envelope(json!([
        { "symbol": "BTCUSDT", "baseCoin": "BTC", "quoteCoin": "USDT", "minTradeAmount": "0",
          "makerFeeRate": "0.001", "takerFeeRate": "0.001", "status": "online" },
        { "symbol": "ETHBTC", "baseCoin": "ETH", "quoteCoin": "BTC", "minTradeAmount": "0",
          "makerFeeRate": "0.001", "takerFeeRate": "0.001", "status": "online" },
        { "symbol": "ETHUSDT", "baseCoin": "ETH", "quoteCoin": "USDT", "minTradeAmount": "0.01",
          "makerFeeRate": "0.001", "takerFeeRate": "0.002", "status": "online" }
    ]))
}

async fn spot_tickers(State(state): State<Arc<MockState>>) -> Response {
    if let Some(resp) = guard(&state) {
        return resp;
    }
    envelope(json!([
        { "symbol": "BTCUSDT", "lastPr": "65000", "open": "64000", "high24h": "66000",
          "low24h": "63000", "baseVolume": "1000", "quoteVolume": "65000000" },
        { "symbol": "ETHUSDT", "lastPr": "3000", "open": "3100", "high24h": "3200",
          "low24h": "2900", "baseVolume": "5000", "quoteVolume": "15000000" },
        { "lastPr": "no symbol, skipped" }
    ]))
}

async fn futures_tickers(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Some(resp) = guard(&state) {
        return resp;
    }
    if params.get("productType").map(String::as_str) != Some("umcbl") {
        return Json(json!({ "code": "40019", "msg": "productType invalid", "data": null }))
            .into_response();
    }
    envelope(json!([
        { "symbol": "ETHUSDT_UMCBL", "lastPr": "3001", "change24h": "-0.02",
          "baseVolume": "0.07", "quoteVolume": "200", "usdtVolume": "200" },
        { "symbol": "BTCUSDT_UMCBL", "lastPr": "65010", "change24h": "0.01",
          "baseVolume": "0.01", "quoteVolume": "900", "usdtVolume": "900" }
    ]))
}

async fn api_error() -> Response {
    Json(json!({ "code": "40001", "msg": "bad request", "data": null })).into_response()
}

async fn relay(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Some(resp) = guard(&state) {
        return resp;
    }
    if let Some(url) = params.get("url") {
        *state.last_feed_param.lock().unwrap() = Some(url.clone());
    }
    RSS.into_response()
}

async fn feed(State(state): State<Arc<MockState>>) -> Response {
    if let Some(resp) = guard(&state) {
        return resp;
    }
    ([("content-type", "application/rss+xml")], RSS).into_response()
}
