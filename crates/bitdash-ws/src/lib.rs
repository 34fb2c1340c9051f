//! WebSocket client for the exchange public stream.
//!
//! Every subscription owns exactly one connection:
//! - `ChannelSubscription::open` connects, subscribes and forwards data frames
//! - Closing (or dropping) the subscription tears the connection down
//! - Heartbeat monitoring (text ping/pong) with reconnect and exponential backoff
//! - Observable subscription state (Disconnected / Connecting / Subscribed)

pub mod connection;
pub mod error;
pub mod heartbeat;
pub mod message;
pub mod subscription;

pub use connection::{ChannelSubscription, StreamConfig};
pub use error::{WsError, WsResult};
pub use message::{Channel, DataMessage, EventMessage, SubscriptionArg, WsMessage, WsRequest};
pub use subscription::{SubscriptionState, SubscriptionStatus, SubscriptionTracker};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
