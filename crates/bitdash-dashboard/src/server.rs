//! HTTP server implementation using axum.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use bitdash_telemetry::Metrics;
use futures_util::stream::StreamExt;
use futures_util::SinkExt;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::broadcast::run_broadcaster;
use crate::config::DashboardConfig;
use crate::state::{DashboardState, SelectionError};
use crate::types::{DashboardMessage, DashboardSnapshot};

/// Broadcast buffer per client, in updates.
const BROADCAST_CAPACITY: usize = 32;

/// Connection limiter to prevent too many concurrent WebSocket connections.
pub struct ConnectionLimiter {
    current: AtomicUsize,
    max: usize,
}

impl ConnectionLimiter {
    pub fn new(max: usize) -> Self {
        Self {
            current: AtomicUsize::new(0),
            max,
        }
    }

    pub fn try_acquire(self: &Arc<Self>) -> Option<ConnectionGuard> {
        loop {
            let current = self.current.load(Ordering::Acquire);
            if current >= self.max {
                return None;
            }
            if self
                .current
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                Metrics::dashboard_client_connected();
                return Some(ConnectionGuard {
                    limiter: Arc::clone(self),
                });
            }
        }
    }

    pub fn current_count(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }
}

/// Holds one connection slot until dropped.
pub struct ConnectionGuard {
    limiter: Arc<ConnectionLimiter>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.limiter.current.fetch_sub(1, Ordering::Release);
        Metrics::dashboard_client_disconnected();
    }
}

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    dashboard_state: DashboardState,
    broadcast_tx: broadcast::Sender<String>,
    connection_limiter: Arc<ConnectionLimiter>,
    config: DashboardConfig,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        dashboard_state: DashboardState,
        broadcast_tx: broadcast::Sender<String>,
        config: DashboardConfig,
    ) -> Self {
        Self {
            dashboard_state,
            broadcast_tx,
            connection_limiter: Arc::new(ConnectionLimiter::new(config.max_connections)),
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Close WebSocket clients when `shutdown` fires.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }
}

/// Create the axum router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .route("/api/snapshot", get(get_snapshot))
        .route("/api/select", post(select_symbol))
        .route("/api/news", get(get_news))
        .route("/metrics", get(get_metrics))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the index HTML page.
async fn serve_index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

/// Get current view model as JSON.
async fn get_snapshot(State(state): State<AppState>) -> Json<DashboardSnapshot> {
    Json(state.dashboard_state.collect_snapshot())
}

#[derive(Debug, Deserialize)]
struct SelectRequest {
    symbol: String,
}

/// Request a new selected instrument. Accepted requests are applied asynchronously.
async fn select_symbol(
    State(state): State<AppState>,
    Json(request): Json<SelectRequest>,
) -> Response {
    match state.dashboard_state.request_selection(&request.symbol).await {
        Ok(symbol) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "symbol": symbol })),
        )
            .into_response(),
        Err(e) => {
            let status = match e {
                SelectionError::Empty => StatusCode::BAD_REQUEST,
                SelectionError::Unknown(_) => StatusCode::NOT_FOUND,
                SelectionError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            };
            (status, Json(serde_json::json!({ "error": e.to_string() }))).into_response()
        }
    }
}

/// RSS passthrough. Upstream failures answer with an empty fallback marker.
async fn get_news(State(state): State<AppState>) -> Response {
    match state.dashboard_state.fetch_news_feed().await {
        Ok(xml) => (
            [
                (header::CONTENT_TYPE, "application/xml; charset=utf-8"),
                (header::CACHE_CONTROL, "s-maxage=300, stale-while-revalidate=600"),
            ],
            xml,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "News passthrough failed");
            Metrics::news_fallback();
            Json(serde_json::json!({ "fallback": true, "items": [] })).into_response()
        }
    }
}

/// Prometheus text exposition.
async fn get_metrics() -> Response {
    match Metrics::gather_text() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// WebSocket upgrade handler.
async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let Some(guard) = state.connection_limiter.try_acquire() else {
        warn!(
            current = state.connection_limiter.current_count(),
            max = state.config.max_connections,
            "WebSocket connection limit reached"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
    };

    info!(
        connections = state.connection_limiter.current_count(),
        "New WebSocket connection"
    );

    ws.on_upgrade(move |socket| handle_ws_connection(socket, state, guard))
}

/// Handle a WebSocket connection.
async fn handle_ws_connection(socket: WebSocket, state: AppState, guard: ConnectionGuard) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before rendering so no update falls between snapshot and stream.
    let mut broadcast_rx = state.broadcast_tx.subscribe();

    let initial_msg = DashboardMessage::Snapshot(state.dashboard_state.collect_snapshot());
    match serde_json::to_string(&initial_msg) {
        Ok(json) => {
            if sender.send(Message::Text(json.into())).await.is_err() {
                debug!("Failed to send initial snapshot, client disconnected");
                return;
            }
        }
        Err(e) => warn!(error = %e, "Failed to serialize snapshot"),
    }

    let mut incoming_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    debug!("Client sent close frame");
                    break;
                }
                Err(e) => {
                    debug!(error = %e, "WebSocket receive error");
                    break;
                }
                _ => {}
            }
        }
    });

    loop {
        tokio::select! {
            () = state.shutdown.cancelled() => {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
            result = broadcast_rx.recv() => {
                match result {
                    Ok(msg) => {
                        if sender.send(Message::Text(msg.into())).await.is_err() {
                            debug!("Failed to send message, client disconnected");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "WebSocket client lagged, catching up");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Broadcast channel closed");
                        let _ = sender.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
            _ = &mut incoming_task => {
                debug!("Incoming task completed, closing connection");
                break;
            }
        }
    }

    incoming_task.abort();
    drop(guard);
    info!(
        connections = state.connection_limiter.current_count(),
        "WebSocket connection closed"
    );
}

/// Serve the dashboard on an already bound listener until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    dashboard_state: DashboardState,
    config: DashboardConfig,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (broadcast_tx, _) = broadcast::channel::<String>(BROADCAST_CAPACITY);

    let state = AppState::new(dashboard_state.clone(), broadcast_tx.clone(), config.clone())
        .with_shutdown(shutdown.clone());
    let app = create_router(state);

    let broadcaster_cancel = shutdown.child_token();
    let broadcaster = tokio::spawn(run_broadcaster(
        dashboard_state,
        broadcast_tx,
        config.update_interval_ms,
        broadcaster_cancel.clone(),
    ));

    info!(addr = %listener.local_addr()?, "Dashboard server listening");

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await;

    broadcaster_cancel.cancel();
    if let Err(e) = broadcaster.await {
        warn!(error = %e, "Broadcaster task failed");
    }
    result?;

    info!("Dashboard server stopped");
    Ok(())
}

/// Run the dashboard HTTP server.
pub async fn run_server(
    dashboard_state: DashboardState,
    config: DashboardConfig,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = config.bind_addr();
    info!(addr = %addr, "Starting dashboard server");

    let listener = TcpListener::bind(&addr).await?;
    serve(listener, dashboard_state, config, shutdown).await
}
