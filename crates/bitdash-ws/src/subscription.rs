//! Subscription state tracking.
//!
//! Each channel subscription moves through
//! `Disconnected -> Connecting -> Subscribed` and back to `Disconnected`
//! when its connection ends or the subscription is closed.

use bitdash_telemetry::Metrics;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};

/// Subscription state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    #[default]
    Disconnected,
    Connecting,
    Subscribed,
}

impl SubscriptionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Subscribed => "subscribed",
        }
    }
}

impl std::fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a subscription.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SubscriptionStatus {
    pub state: SubscriptionState,
    /// When the current connection became subscribed.
    pub subscribed_at: Option<DateTime<Utc>>,
    /// Last data frame received.
    pub last_message_at: Option<DateTime<Utc>>,
    /// Data frames received over the subscription's lifetime.
    pub messages: u64,
}

/// Shared state tracker for one channel subscription.
#[derive(Debug)]
pub struct SubscriptionTracker {
    channel: String,
    status: RwLock<SubscriptionStatus>,
}

impl SubscriptionTracker {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            status: RwLock::new(SubscriptionStatus::default()),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn state(&self) -> SubscriptionState {
        self.status.read().state
    }

    pub fn status(&self) -> SubscriptionStatus {
        self.status.read().clone()
    }

    pub fn mark_connecting(&self) {
        self.transition(SubscriptionState::Connecting);
    }

    /// Mark subscribed. Returns `true` on the transition, `false` if already subscribed.
    pub fn mark_subscribed(&self) -> bool {
        let changed = self.transition(SubscriptionState::Subscribed);
        if changed {
            self.status.write().subscribed_at = Some(Utc::now());
            info!(channel = %self.channel, "Subscription active");
        }
        changed
    }

    pub fn mark_disconnected(&self) {
        if self.transition(SubscriptionState::Disconnected) {
            self.status.write().subscribed_at = None;
        }
    }

    /// Record a data frame.
    pub fn record_message(&self) {
        let mut status = self.status.write();
        status.last_message_at = Some(Utc::now());
        status.messages += 1;
    }

    fn transition(&self, next: SubscriptionState) -> bool {
        let mut status = self.status.write();
        if status.state == next {
            return false;
        }
        debug!(channel = %self.channel, from = %status.state, to = %next, "Subscription state");
        status.state = next;
        Metrics::stream_state_set(&self.channel, next.as_str());
        true
    }
}
