//! Prometheus metrics for bitdash.
//!
//! Covers:
//! - REST poll outcomes per endpoint
//! - Stream connection state, messages and dropped messages per channel
//! - News fallbacks and selection changes
//! - Dashboard WebSocket clients
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a programming error caught at first use.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_int_counter, register_int_gauge,
    CounterVec, Encoder, GaugeVec, IntCounter, IntGauge, TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// REST requests by endpoint and outcome (ok/error).
pub static REST_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bitdash_rest_requests_total",
        "Total REST requests by endpoint and outcome",
        &["endpoint", "outcome"]
    )
    .unwrap()
});

/// Stream subscription state per channel.
/// Labels: channel, state (disconnected/connecting/subscribed)
pub static STREAM_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "bitdash_stream_state",
        "Stream subscription state (1=active, 0=inactive)",
        &["channel", "state"]
    )
    .unwrap()
});

/// Stream data messages accepted per channel.
pub static STREAM_MESSAGES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bitdash_stream_messages_total",
        "Total stream data messages accepted",
        &["channel"]
    )
    .unwrap()
});

/// Stream messages dropped per channel and reason.
pub static STREAM_DROPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bitdash_stream_dropped_total",
        "Total stream messages dropped",
        &["channel", "reason"]
    )
    .unwrap()
});

/// Stream reconnect attempts per channel.
pub static STREAM_RECONNECT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bitdash_stream_reconnect_total",
        "Total stream reconnection attempts",
        &["channel"]
    )
    .unwrap()
});

/// News fetches that fell back to the placeholder list.
pub static NEWS_FALLBACK_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "bitdash_news_fallback_total",
        "Total news fetches served from the fallback list"
    )
    .unwrap()
});

/// Selection changes.
pub static SELECTION_CHANGES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "bitdash_selection_changes_total",
        "Total selected instrument changes"
    )
    .unwrap()
});

/// Connected dashboard WebSocket clients.
pub static DASHBOARD_CLIENTS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "bitdash_dashboard_clients",
        "Connected dashboard WebSocket clients"
    )
    .unwrap()
});

const STREAM_STATES: [&str; 3] = ["disconnected", "connecting", "subscribed"];

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    /// Record a REST request outcome.
    pub fn rest_request(endpoint: &str, ok: bool) {
        let outcome = if ok { "ok" } else { "error" };
        REST_REQUESTS_TOTAL
            .with_label_values(&[endpoint, outcome])
            .inc();
    }

    /// Set the stream state for a channel.
    /// Only the active state is set to 1, all others to 0.
    pub fn stream_state_set(channel: &str, state: &str) {
        for s in STREAM_STATES {
            let value = if s == state { 1.0 } else { 0.0 };
            STREAM_STATE.with_label_values(&[channel, s]).set(value);
        }
    }

    pub fn stream_message(channel: &str) {
        STREAM_MESSAGES_TOTAL.with_label_values(&[channel]).inc();
    }

    pub fn stream_dropped(channel: &str, reason: &str) {
        STREAM_DROPPED_TOTAL
            .with_label_values(&[channel, reason])
            .inc();
    }

    pub fn stream_reconnect(channel: &str) {
        STREAM_RECONNECT_TOTAL.with_label_values(&[channel]).inc();
    }

    pub fn news_fallback() {
        NEWS_FALLBACK_TOTAL.inc();
    }

    pub fn selection_changed() {
        SELECTION_CHANGES_TOTAL.inc();
    }

    pub fn dashboard_client_connected() {
        DASHBOARD_CLIENTS.inc();
    }

    pub fn dashboard_client_disconnected() {
        DASHBOARD_CLIENTS.dec();
    }

    /// Render all registered metrics in the Prometheus text format.
    pub fn gather_text() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let families = prometheus::gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_state_is_exclusive() {
        Metrics::stream_state_set("books", "connecting");
        Metrics::stream_state_set("books", "subscribed");

        let subscribed = STREAM_STATE
            .with_label_values(&["books", "subscribed"])
            .get();
        let connecting = STREAM_STATE
            .with_label_values(&["books", "connecting"])
            .get();
        assert_eq!(subscribed, 1.0);
        assert_eq!(connecting, 0.0);
    }

    #[test]
    fn test_gather_text_contains_registered_metrics() {
        Metrics::rest_request("spot_tickers", true);
        let text = Metrics::gather_text().unwrap();
        assert!(text.contains("bitdash_rest_requests_total"));
    }
}
