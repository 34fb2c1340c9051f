//! Heartbeat tracking for one WebSocket connection.
//!
//! The server drops connections that stay silent for 30s, so the client sends
//! a text `ping` whenever nothing has been received for `interval_ms`, and
//! gives up on the connection when the `pong` does not arrive within
//! `timeout_ms`.

use std::time::{Duration, Instant};
use tracing::debug;

/// Heartbeat state, owned by the connection task.
#[derive(Debug)]
pub struct HeartbeatManager {
    /// Idle time before a ping is sent.
    interval_ms: u64,
    /// How long to wait for pong.
    timeout_ms: u64,
    last_ping: Option<Instant>,
    last_message: Instant,
    waiting_for_pong: bool,
}

impl HeartbeatManager {
    pub fn new(interval_ms: u64, timeout_ms: u64) -> Self {
        Self {
            interval_ms,
            timeout_ms,
            last_ping: None,
            last_message: Instant::now(),
            waiting_for_pong: false,
        }
    }

    /// Reset heartbeat state (called on connection).
    pub fn reset(&mut self) {
        self.last_ping = None;
        self.last_message = Instant::now();
        self.waiting_for_pong = false;
    }

    pub fn record_ping(&mut self) {
        self.last_ping = Some(Instant::now());
        self.waiting_for_pong = true;
    }

    pub fn record_pong(&mut self) {
        self.waiting_for_pong = false;
        if let Some(ping) = self.last_ping {
            debug!(rtt_ms = ping.elapsed().as_millis() as u64, "Received pong");
        }
    }

    /// Record that any frame was received.
    pub fn record_message(&mut self) {
        self.last_message = Instant::now();
    }

    pub fn is_waiting_for_pong(&self) -> bool {
        self.waiting_for_pong
    }

    /// Check if the outstanding ping has timed out.
    pub fn is_timed_out(&self) -> bool {
        if !self.waiting_for_pong {
            return false;
        }
        self.last_ping
            .map(|ping| ping.elapsed() > Duration::from_millis(self.timeout_ms))
            .unwrap_or(false)
    }

    /// Check if a ping should be sent now.
    pub fn should_send_ping(&self) -> bool {
        !self.waiting_for_pong
            && self.last_message.elapsed() >= Duration::from_millis(self.interval_ms)
    }

    /// How often the connection loop should evaluate the heartbeat.
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis((self.interval_ms / 2).max(1))
    }
}
