//! WebSocket broadcast functionality.
//!
//! The broadcaster renders the view model at a fixed interval and broadcasts
//! it to all connected WebSocket clients. Cards that rarely change (selector,
//! symbol table, news) are only included when they differ from the last
//! broadcast.

use std::time::Duration;

use bitdash_core::NewsItem;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::state::DashboardState;
use crate::types::{DashboardMessage, DashboardSnapshot, SelectorCard, SymbolRowView};

/// Last broadcast values of the slow-changing cards.
#[derive(Default)]
struct SentCards {
    selector: Option<SelectorCard>,
    symbols: Option<Vec<SymbolRowView>>,
    news: Option<Vec<NewsItem>>,
}

impl SentCards {
    fn update_message(&mut self, snapshot: DashboardSnapshot) -> DashboardMessage {
        DashboardMessage::Update {
            timestamp_ms: snapshot.timestamp_ms,
            price: snapshot.price,
            depth: snapshot.depth,
            futures: snapshot.futures,
            streams: snapshot.streams,
            selector: changed(&mut self.selector, snapshot.selector),
            symbols: changed(&mut self.symbols, snapshot.symbols),
            news: changed(&mut self.news, snapshot.news),
        }
    }
}

/// Return `value` if it differs from `last`, remembering it.
fn changed<T: Clone + PartialEq>(last: &mut Option<T>, value: T) -> Option<T> {
    if last.as_ref() == Some(&value) {
        return None;
    }
    *last = Some(value.clone());
    Some(value)
}

/// Run the broadcaster task until cancelled.
pub async fn run_broadcaster(
    state: DashboardState,
    tx: broadcast::Sender<String>,
    interval_ms: u64,
    shutdown: CancellationToken,
) {
    let mut interval = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
    let mut sent = SentCards::default();

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = interval.tick() => {}
        }

        // Late joiners get every card from their initial snapshot.
        if tx.receiver_count() == 0 {
            sent = SentCards::default();
            continue;
        }

        let msg = sent.update_message(state.collect_snapshot());
        match serde_json::to_string(&msg) {
            Ok(json) => match tx.send(json) {
                Ok(n) => trace!(receivers = n, "Broadcast update sent"),
                Err(_) => trace!("No WebSocket receivers connected"),
            },
            Err(e) => debug!(error = %e, "Failed to serialize dashboard update"),
        }
    }

    debug!("Broadcaster stopped");
}
