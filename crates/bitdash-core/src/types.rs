//! Market data types shown on the dashboard.
//!
//! Contains the spot ticker snapshot and its streaming delta, the order book
//! snapshot, futures rows, listed symbols and news items.

use crate::error::{CoreError, Result};
use crate::{parse_decimal, Price, Size};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A listed spot symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// Exchange symbol (e.g., "BTCUSDT").
    pub symbol: String,
    pub base_coin: String,
    pub quote_coin: String,
    /// Minimum trade amount in base coin.
    pub min_trade_amount: Option<Decimal>,
    pub maker_fee_rate: Option<Decimal>,
    pub taker_fee_rate: Option<Decimal>,
    /// Listing status (e.g., "online").
    pub status: Option<String>,
}

/// Spot ticker snapshot for one instrument.
///
/// Every numeric field is optional: a missing value is "no data", never zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerSnapshot {
    pub symbol: String,
    pub last_price: Option<Price>,
    pub open_24h: Option<Price>,
    pub high_24h: Option<Price>,
    pub low_24h: Option<Price>,
    pub base_volume_24h: Option<Decimal>,
    pub quote_volume_24h: Option<Decimal>,
}

impl TickerSnapshot {
    /// Create an empty snapshot for a symbol.
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            last_price: None,
            open_24h: None,
            high_24h: None,
            low_24h: None,
            base_volume_24h: None,
            quote_volume_24h: None,
        }
    }

    /// Merge a streaming update into this snapshot.
    ///
    /// Present fields overwrite, absent fields keep their prior value.
    /// Updates for a different symbol are ignored. Returns whether the
    /// snapshot changed.
    pub fn apply(&mut self, update: &TickerUpdate) -> bool {
        if update.symbol != self.symbol {
            return false;
        }

        let before = self.clone();
        overwrite(&mut self.last_price, update.last_price);
        overwrite(&mut self.open_24h, update.open_24h);
        overwrite(&mut self.high_24h, update.high_24h);
        overwrite(&mut self.low_24h, update.low_24h);
        overwrite(&mut self.base_volume_24h, update.base_volume_24h);
        overwrite(&mut self.quote_volume_24h, update.quote_volume_24h);
        *self != before
    }

    /// 24h change in percent (0 when open or last is unknown).
    pub fn change_pct(&self) -> f64 {
        crate::format::pct(self.open_24h, self.last_price)
    }
}

fn overwrite<T: Copy>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Partial ticker carried by one streaming message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerUpdate {
    pub symbol: String,
    pub last_price: Option<Price>,
    pub open_24h: Option<Price>,
    pub high_24h: Option<Price>,
    pub low_24h: Option<Price>,
    pub base_volume_24h: Option<Decimal>,
    pub quote_volume_24h: Option<Decimal>,
    /// Exchange timestamp (Unix milliseconds).
    pub ts: Option<i64>,
}

impl TickerUpdate {
    /// Check whether the update carries no ticker fields at all.
    pub fn is_empty(&self) -> bool {
        self.last_price.is_none()
            && self.open_24h.is_none()
            && self.high_24h.is_none()
            && self.low_24h.is_none()
            && self.base_volume_24h.is_none()
            && self.quote_volume_24h.is_none()
    }
}

impl From<TickerUpdate> for TickerSnapshot {
    fn from(update: TickerUpdate) -> Self {
        Self {
            symbol: update.symbol,
            last_price: update.last_price,
            open_24h: update.open_24h,
            high_24h: update.high_24h,
            low_24h: update.low_24h,
            base_volume_24h: update.base_volume_24h,
            quote_volume_24h: update.quote_volume_24h,
        }
    }
}

/// One order book level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Price,
    pub size: Size,
}

impl BookLevel {
    pub fn new(price: Price, size: Size) -> Self {
        Self { price, size }
    }

    /// Parse a `[price, size, ...]` wire pair.
    pub fn from_pair(pair: &[String]) -> Result<Self> {
        let (price, size) = match pair {
            [price, size, ..] => (price, size),
            _ => return Err(CoreError::InvalidLevel(format!("{pair:?}"))),
        };
        let price = parse_decimal(price).ok_or_else(|| CoreError::InvalidPrice(price.clone()))?;
        let size = parse_decimal(size).ok_or_else(|| CoreError::InvalidSize(size.clone()))?;
        Ok(Self::new(Price::new(price), Size::new(size)))
    }
}

/// Order book snapshot.
///
/// Replaced wholesale by every streaming message (last message wins). The
/// exchange sequence number is carried for diagnostics only; no gap detection
/// is performed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    /// Bids, best first.
    pub bids: Vec<BookLevel>,
    /// Asks, best first.
    pub asks: Vec<BookLevel>,
    /// Exchange timestamp (Unix milliseconds).
    pub ts: Option<i64>,
    /// Exchange sequence number.
    pub seq: Option<u64>,
}

impl OrderBookSnapshot {
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Largest level size across both sides.
    pub fn max_size(&self) -> Size {
        self.bids
            .iter()
            .chain(self.asks.iter())
            .map(|level| level.size)
            .max()
            .unwrap_or(Size::ZERO)
    }
}

/// Futures ticker row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuturesRow {
    /// Contract identifier (e.g., "BTCUSDT_UMCBL").
    pub instrument_id: String,
    pub last_price: Option<Price>,
    /// 24h change as a ratio (0.0123 = 1.23%).
    pub change_24h: Option<Decimal>,
    pub quote_volume_24h: Option<Decimal>,
}

impl FuturesRow {
    /// Rank rows by 24h quote volume, highest first, keeping at most `limit`.
    ///
    /// The sort is stable: rows with equal volume keep their input order.
    /// A missing volume ranks as zero.
    pub fn rank_by_volume(rows: &[FuturesRow], limit: usize) -> Vec<FuturesRow> {
        let mut ranked = rows.to_vec();
        ranked.sort_by(|a, b| {
            let va = a.quote_volume_24h.unwrap_or(Decimal::ZERO);
            let vb = b.quote_volume_24h.unwrap_or(Decimal::ZERO);
            vb.cmp(&va)
        });
        ranked.truncate(limit);
        ranked
    }
}

/// News feed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    /// Raw `pubDate` text, when the feed provides one.
    pub published_at: Option<String>,
}

impl NewsItem {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            published_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn update(symbol: &str) -> TickerUpdate {
        TickerUpdate {
            symbol: symbol.to_string(),
            last_price: None,
            open_24h: None,
            high_24h: None,
            low_24h: None,
            base_volume_24h: None,
            quote_volume_24h: None,
            ts: None,
        }
    }

    fn btc_snapshot() -> TickerSnapshot {
        TickerSnapshot {
            symbol: "BTCUSDT".to_string(),
            last_price: Some(Price::new(dec!(64000))),
            open_24h: Some(Price::new(dec!(63000))),
            high_24h: Some(Price::new(dec!(65000))),
            low_24h: Some(Price::new(dec!(62000))),
            base_volume_24h: Some(dec!(1200)),
            quote_volume_24h: Some(dec!(76800000)),
        }
    }

    #[test]
    fn test_apply_overwrites_present_fields_only() {
        let mut snapshot = btc_snapshot();
        let mut delta = update("BTCUSDT");
        delta.last_price = Some(Price::new(dec!(64100)));
        delta.high_24h = Some(Price::new(dec!(65100)));

        assert!(snapshot.apply(&delta));
        assert_eq!(snapshot.last_price, Some(Price::new(dec!(64100))));
        assert_eq!(snapshot.high_24h, Some(Price::new(dec!(65100))));
        // Absent fields preserved
        assert_eq!(snapshot.open_24h, Some(Price::new(dec!(63000))));
        assert_eq!(snapshot.quote_volume_24h, Some(dec!(76800000)));
    }

    #[test]
    fn test_apply_ignores_other_symbol() {
        let mut snapshot = btc_snapshot();
        let mut delta = update("ETHUSDT");
        delta.last_price = Some(Price::new(dec!(3100)));

        assert!(!snapshot.apply(&delta));
        assert_eq!(snapshot, btc_snapshot());
    }

    #[test]
    fn test_apply_keeps_zero_value() {
        let mut snapshot = btc_snapshot();
        let mut delta = update("BTCUSDT");
        delta.base_volume_24h = Some(Decimal::ZERO);

        assert!(snapshot.apply(&delta));
        assert_eq!(snapshot.base_volume_24h, Some(Decimal::ZERO));
    }

    #[test]
    fn test_book_level_from_pair() {
        let level =
            BookLevel::from_pair(&["64000.5".to_string(), "0.25".to_string()]).unwrap();
        assert_eq!(level.price, Price::new(dec!(64000.5)));
        assert_eq!(level.size, Size::new(dec!(0.25)));

        assert!(BookLevel::from_pair(&["64000.5".to_string()]).is_err());
        assert!(BookLevel::from_pair(&["x".to_string(), "1".to_string()]).is_err());
    }

    #[test]
    fn test_book_max_size() {
        let book = OrderBookSnapshot {
            bids: vec![BookLevel::new(Price::new(dec!(10)), Size::new(dec!(2)))],
            asks: vec![
                BookLevel::new(Price::new(dec!(11)), Size::new(dec!(5))),
                BookLevel::new(Price::new(dec!(12)), Size::new(dec!(1))),
            ],
            ts: None,
            seq: None,
        };
        assert_eq!(book.max_size(), Size::new(dec!(5)));
        assert_eq!(OrderBookSnapshot::default().max_size(), Size::ZERO);
    }

    #[test]
    fn test_rank_by_volume_is_stable() {
        let row = |id: &str, vol: Option<Decimal>| FuturesRow {
            instrument_id: id.to_string(),
            last_price: None,
            change_24h: None,
            quote_volume_24h: vol,
        };
        let rows = vec![
            row("A", Some(dec!(10))),
            row("B", Some(dec!(30))),
            row("C", Some(dec!(10))),
            row("D", None),
            row("E", Some(dec!(30))),
        ];

        let ranked = FuturesRow::rank_by_volume(&rows, 10);
        let ids: Vec<_> = ranked.iter().map(|r| r.instrument_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "E", "A", "C", "D"]);

        assert_eq!(FuturesRow::rank_by_volume(&rows, 2).len(), 2);
    }
}
