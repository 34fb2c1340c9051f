//! Interval polling.
//!
//! `poll` turns a fallible fetch into an infinite stream: the first fetch
//! runs immediately, then once per interval. A failed fetch is logged and
//! yields nothing for that tick, so consumers keep whatever they stored last.
//! Each call builds an independent stream.

use futures_util::stream::{self, Stream};
use std::future::Future;
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::warn;

use crate::error::RestResult;

/// Poll `fetch` every `interval`, yielding each successful result.
pub fn poll<T, F, Fut>(name: &'static str, every: Duration, fetch: F) -> impl Stream<Item = T> + Send
where
    T: Send,
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = RestResult<T>> + Send,
{
    // The interval is created on first poll so the stream can be built outside a runtime.
    let state: (Option<Interval>, F) = (None, fetch);

    stream::unfold(state, move |(mut ticker, mut fetch)| async move {
        let interval = ticker.get_or_insert_with(|| {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        loop {
            interval.tick().await;
            match fetch().await {
                Ok(value) => return Some((value, (ticker, fetch))),
                Err(e) => warn!(poller = name, error = %e, "Poll failed, keeping previous data"),
            }
        }
    })
}
