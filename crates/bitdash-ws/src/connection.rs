//! Per-channel WebSocket connection.
//!
//! A [`ChannelSubscription`] owns one connection task for one
//! (channel, instrument) pair. The task connects, subscribes, forwards data
//! frames for that pair and reconnects with exponential backoff until the
//! subscription is closed. Closing cancels the task, sends a close frame and
//! waits for the task to finish, so a caller that closes before opening the
//! next subscription never has two live connections for the same channel.

use std::sync::Arc;
use std::time::Duration;

use bitdash_telemetry::Metrics;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{WsError, WsResult};
use crate::heartbeat::HeartbeatManager;
use crate::message::{Channel, DataMessage, SubscriptionArg, WsMessage, WsRequest, PING};
use crate::subscription::{SubscriptionState, SubscriptionTracker};

/// Stream configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// WebSocket URL.
    #[serde(default = "default_url")]
    pub url: String,
    /// Instrument type sent with every subscription (empty = omitted).
    #[serde(default = "default_inst_type")]
    pub inst_type: String,
    /// Idle time before a ping is sent.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Pong must arrive within this.
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,
    /// Base delay for exponential backoff.
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    /// Maximum delay for exponential backoff.
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    /// Maximum reconnection attempts (0 = infinite).
    #[serde(default)]
    pub max_reconnect_attempts: u32,
    /// Capacity of the data frame channel.
    #[serde(default = "default_buffer")]
    pub buffer: usize,
}

fn default_url() -> String {
    "wss://ws.bitget.com/v2/ws/public".to_string()
}

fn default_inst_type() -> String {
    "SPOT".to_string()
}

fn default_heartbeat_interval_ms() -> u64 {
    25_000
}

fn default_heartbeat_timeout_ms() -> u64 {
    10_000
}

fn default_reconnect_base_delay_ms() -> u64 {
    1_000
}

fn default_reconnect_max_delay_ms() -> u64 {
    30_000
}

fn default_buffer() -> usize {
    256
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            inst_type: default_inst_type(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
            max_reconnect_attempts: 0,
            buffer: default_buffer(),
        }
    }
}

impl StreamConfig {
    /// Build the subscription argument for a channel and instrument.
    pub fn arg(&self, channel: Channel, inst_id: &str) -> SubscriptionArg {
        let inst_type = (!self.inst_type.is_empty()).then(|| self.inst_type.clone());
        SubscriptionArg::new(inst_type, channel, inst_id)
    }
}

/// Handle to one live channel subscription.
///
/// Dropping the handle cancels the connection task without waiting for it;
/// use [`ChannelSubscription::close`] to wait for the teardown.
#[derive(Debug)]
pub struct ChannelSubscription {
    arg: SubscriptionArg,
    tracker: Arc<SubscriptionTracker>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ChannelSubscription {
    /// Open a subscription. Data frames for `inst_id` on `channel` arrive on
    /// the returned receiver.
    pub fn open(
        config: &StreamConfig,
        channel: Channel,
        inst_id: &str,
    ) -> (Self, mpsc::Receiver<DataMessage>) {
        let arg = config.arg(channel, inst_id);
        let tracker = Arc::new(SubscriptionTracker::new(channel.as_str()));
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(config.buffer.max(1));

        let worker = ConnectionWorker {
            config: config.clone(),
            arg: arg.clone(),
            tracker: tracker.clone(),
            cancel: cancel.clone(),
            tx,
        };

        info!(subscription = %arg, "Opening subscription");
        let task = tokio::spawn(worker.run());

        let subscription = Self {
            arg,
            tracker,
            cancel,
            task: Some(task),
        };
        (subscription, rx)
    }

    pub fn arg(&self) -> &SubscriptionArg {
        &self.arg
    }

    pub fn state(&self) -> SubscriptionState {
        self.tracker.state()
    }

    pub fn tracker(&self) -> Arc<SubscriptionTracker> {
        self.tracker.clone()
    }

    /// Close the connection and wait for its task to finish.
    pub async fn close(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(subscription = %self.arg, error = %e, "Subscription task failed");
            }
        }
        self.tracker.mark_disconnected();
        info!(subscription = %self.arg, "Subscription closed");
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for ChannelSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Connection task state.
struct ConnectionWorker {
    config: StreamConfig,
    arg: SubscriptionArg,
    tracker: Arc<SubscriptionTracker>,
    cancel: CancellationToken,
    tx: mpsc::Sender<DataMessage>,
}

impl ConnectionWorker {
    async fn run(self) {
        let mut attempt = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            self.tracker.mark_connecting();

            match self.connect_once(&mut attempt).await {
                Ok(()) => debug!(subscription = %self.arg, "Connection ended"),
                Err(WsError::ReceiverDropped) => {
                    debug!(subscription = %self.arg, "Receiver dropped, stopping");
                    break;
                }
                Err(e) => warn!(subscription = %self.arg, error = %e, "Connection error"),
            }

            self.tracker.mark_disconnected();

            if self.cancel.is_cancelled() || self.tx.is_closed() {
                break;
            }

            attempt += 1;
            if self.config.max_reconnect_attempts > 0
                && attempt >= self.config.max_reconnect_attempts
            {
                error!(subscription = %self.arg, attempt, "Max reconnection attempts reached");
                break;
            }

            let delay = backoff_delay(
                self.config.reconnect_base_delay_ms,
                self.config.reconnect_max_delay_ms,
                attempt,
            );
            Metrics::stream_reconnect(&self.arg.channel);
            warn!(
                subscription = %self.arg,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Reconnecting"
            );

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.cancel.cancelled() => break,
            }
        }

        self.tracker.mark_disconnected();
    }

    async fn connect_once(&self, attempt: &mut u32) -> WsResult<()> {
        debug!(url = %self.config.url, subscription = %self.arg, "Connecting");

        let (ws_stream, _response) = tokio::select! {
            result = connect_async(self.config.url.as_str()) => result?,
            () = self.cancel.cancelled() => return Ok(()),
        };
        let (mut write, mut read) = ws_stream.split();

        let request = WsRequest::subscribe(vec![self.arg.clone()]);
        write
            .send(Message::Text(serde_json::to_string(&request)?))
            .await?;

        let mut heartbeat = HeartbeatManager::new(
            self.config.heartbeat_interval_ms,
            self.config.heartbeat_timeout_ms,
        );
        heartbeat.reset();
        let mut check = tokio::time::interval(heartbeat.check_interval());
        check.tick().await;

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!(error = %e, "Failed to send close frame");
                    }
                    return Ok(());
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            heartbeat.record_message();
                            if self.handle_text(&text, &mut heartbeat).await? {
                                *attempt = 0;
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "Normal close".to_string()));
                            return Err(WsError::ConnectionClosed { code, reason });
                        }
                        Some(Err(e)) => return Err(e.into()),
                        None => return Ok(()),
                        _ => {}
                    }
                }

                _ = check.tick() => {
                    if heartbeat.is_timed_out() {
                        return Err(WsError::HeartbeatTimeout);
                    }
                    if heartbeat.should_send_ping() {
                        write.send(Message::Text(PING.to_string())).await?;
                        heartbeat.record_ping();
                    }
                }
            }
        }
    }

    /// Handle one text frame. Returns `true` when the subscription just became active.
    async fn handle_text(&self, text: &str, heartbeat: &mut HeartbeatManager) -> WsResult<bool> {
        let channel = self.arg.channel.as_str();

        let msg = match WsMessage::parse(text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(subscription = %self.arg, error = %e, "Dropping malformed frame");
                Metrics::stream_dropped(channel, "malformed");
                return Ok(false);
            }
        };

        match msg {
            WsMessage::Pong => {
                heartbeat.record_pong();
                Ok(false)
            }
            WsMessage::Event(event) if event.is_error() => {
                let reason = event.msg.unwrap_or_else(|| "unknown".to_string());
                Err(WsError::SubscriptionError(reason))
            }
            WsMessage::Event(event) => {
                if event.is_subscribe_ack()
                    && event.arg.as_ref().is_some_and(|arg| self.arg.matches(arg))
                {
                    return Ok(self.tracker.mark_subscribed());
                }
                debug!(event = %event.event, "Ignoring event");
                Ok(false)
            }
            WsMessage::Data(data) => {
                if !self.arg.matches(&data.arg) {
                    debug!(subscription = %self.arg, foreign = %data.arg, "Dropping foreign frame");
                    Metrics::stream_dropped(channel, "foreign");
                    return Ok(false);
                }

                // Some frames arrive before the ack.
                let activated = self.tracker.mark_subscribed();
                self.tracker.record_message();
                Metrics::stream_message(channel);

                // A full buffer must not block cancellation.
                tokio::select! {
                    result = self.tx.send(data) => {
                        result.map_err(|_| WsError::ReceiverDropped)?;
                    }
                    () = self.cancel.cancelled() => {}
                }
                Ok(activated)
            }
        }
    }
}

/// Exponential backoff: `base * 2^(attempt-1)`, capped at `max`, plus jitter.
fn backoff_delay(base_ms: u64, max_ms: u64, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(10);
    let delay = base_ms.saturating_mul(1u64 << exponent).min(max_ms);
    Duration::from_millis(delay + jitter_ms(base_ms))
}

/// Jitter in `[0, base_ms)` (at most 1000ms).
fn jitter_ms(base_ms: u64) -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let bound = base_ms.clamp(1, 1000);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    u64::from(nanos) % bound
}
