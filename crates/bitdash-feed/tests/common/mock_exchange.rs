//! Mock exchange for feed integration tests.
//!
//! - WebSocket: acks subscriptions and pushes frames produced by a script
//!   function of `(channel, instId)`; counts open connections.
//! - REST: serves the spot tickers and symbols endpoints, switchable into a
//!   failing mode.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};

pub type Script = Arc<dyn Fn(&str, &str) -> Vec<String> + Send + Sync>;

pub struct MockWsExchange {
    addr: SocketAddr,
    active: Arc<AtomicUsize>,
}

impl MockWsExchange {
    pub async fn start(script: Script) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let active = Arc::new(AtomicUsize::new(0));

        let active_clone = active.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(handle_ws(stream, script.clone(), active_clone.clone()));
            }
        });

        Self { addr, active }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

async fn handle_ws(stream: TcpStream, script: Script, active: Arc<AtomicUsize>) {
    let Ok(ws) = accept_async(stream).await else {
        return;
    };
    active.fetch_add(1, Ordering::SeqCst);
    let (mut write, mut read) = ws.split();

    while let Some(Ok(msg)) = read.next().await {
        match msg {
            Message::Text(text) if text == "ping" => {
                let _ = write.send(Message::Text("pong".to_string())).await;
            }
            Message::Text(text) => {
                let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) else {
                    continue;
                };
                let Some(arg) = value.get("args").and_then(|a| a.get(0)).cloned() else {
                    continue;
                };
                let channel = arg["channel"].as_str().unwrap_or_default().to_string();
                let inst_id = arg["instId"].as_str().unwrap_or_default().to_string();

                let ack = json!({ "event": "subscribe", "arg": arg });
                let _ = write.send(Message::Text(ack.to_string())).await;
                for frame in script(&channel, &inst_id) {
                    let _ = write.send(Message::Text(frame)).await;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    active.fetch_sub(1, Ordering::SeqCst);
}

/// Data frame whose arg addresses `(channel, arg_inst)`.
pub fn frame(channel: &str, arg_inst: &str, item: serde_json::Value) -> String {
    json!({
        "action": "snapshot",
        "arg": { "instType": "SPOT", "channel": channel, "instId": arg_inst },
        "data": [item],
        "ts": 1700000000000i64
    })
    .to_string()
}

#[derive(Default)]
pub struct RestState {
    pub failing: AtomicBool,
}

pub struct MockRestExchange {
    addr: SocketAddr,
    state: Arc<RestState>,
}

impl MockRestExchange {
    pub async fn start() -> Self {
        let state = Arc::new(RestState::default());
        let app = Router::new()
            .route("/api/v2/spot/market/tickers", get(spot_tickers))
            .route("/api/v2/spot/public/symbols", get(symbols))
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

    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }
}

async fn spot_tickers(State(state): State<Arc<RestState>>) -> Response {
    if state.failing.load(Ordering::SeqCst) {
        return StatusCode::BAD_GATEWAY.into_response();
    }
    Json(json!({
        "code": "00000",
        "msg": "success",
        "data": [
            { "symbol": "BTCUSDT", "lastPr": "65000", "open": "64000" },
            { "symbol": "ETHUSDT", "lastPr": "3000", "open": "3100" }
        ]
    }))
    .into_response()
}

async fn symbols(State(state): State<Arc<RestState>>) -> Response {
    if state.failing.load(Ordering::SeqCst) {
        return StatusCode::BAD_GATEWAY.into_response();
    }
    Json(json!({
        "code": "00000",
        "msg": "success",
        "data": [
            { "symbol": "BTCUSDT", "baseCoin": "BTC", "quoteCoin": "USDT" },
            { "symbol": "ETHUSDT", "baseCoin": "ETH", "quoteCoin": "USDT" }
        ]
    }))
    .into_response()
}
