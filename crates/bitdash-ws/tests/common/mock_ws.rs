//! Mock exchange WebSocket server for integration tests.
//!
//! - Acks every subscribe request
//! - Pushes the scripted frames after each ack
//! - Answers text `ping` with `pong`
//! - Records received text frames and tracks open connections

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};

pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    messages: Arc<Mutex<Vec<String>>>,
    active: Arc<AtomicUsize>,
    accepted: Arc<AtomicUsize>,
}

impl MockWsServer {
    /// Start a server that pushes `frames` after acking a subscription.
    pub async fn start(frames: Vec<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let messages = Arc::new(Mutex::new(Vec::new()));
        let active = Arc::new(AtomicUsize::new(0));
        let accepted = Arc::new(AtomicUsize::new(0));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let frames = Arc::new(frames);

        let messages_clone = messages.clone();
        let active_clone = active.clone();
        let accepted_clone = accepted.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        accepted_clone.fetch_add(1, Ordering::SeqCst);
                        tokio::spawn(handle_connection(
                            stream,
                            messages_clone.clone(),
                            active_clone.clone(),
                            frames.clone(),
                        ));
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            messages,
            active,
            accepted,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Connections currently open.
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Connections accepted over the server's lifetime.
    pub fn accepted_connections(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    pub async fn received_messages(&self) -> Vec<String> {
        self.messages.lock().await.clone()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    messages: Arc<Mutex<Vec<String>>>,
    active: Arc<AtomicUsize>,
    frames: Arc<Vec<String>>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };
    active.fetch_add(1, Ordering::SeqCst);

    let (mut write, mut read) = ws_stream.split();

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                messages.lock().await.push(text.clone());

                if text == "ping" {
                    let _ = write.send(Message::Text("pong".to_string())).await;
                    continue;
                }

                let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&text) else {
                    continue;
                };
                if parsed.get("op") != Some(&serde_json::json!("subscribe")) {
                    continue;
                }
                if let Some(arg) = parsed.get("args").and_then(|a| a.get(0)) {
                    let ack = serde_json::json!({ "event": "subscribe", "arg": arg });
                    let _ = write.send(Message::Text(ack.to_string())).await;
                }
                for frame in frames.iter() {
                    let _ = write.send(Message::Text(frame.clone())).await;
                }
            }
            Ok(Message::Ping(data)) => {
                let _ = write.send(Message::Pong(data)).await;
            }
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            _ => {}
        }
    }

    active.fetch_sub(1, Ordering::SeqCst);
}
