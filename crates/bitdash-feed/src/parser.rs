//! Stream message parsing.
//!
//! Converts `data[0]` of ticker and books frames into typed updates.
//!
//! Ticker item: `{"instId":"BTCUSDT","lastPr":"65000","open24h":"..","high24h":"..",
//! "low24h":"..","baseVolume":"..","quoteVolume":"..","ts":"1700000000000"}`.
//! Older payloads use `baseVol`/`quoteVol`/`last`; both spellings are accepted.
//!
//! Books item: `{"bids":[["65000","0.5"],..],"asks":[..],"ts":"..","seq":123}`.

use bitdash_core::{parse_decimal, BookLevel, OrderBookSnapshot, Price, TickerUpdate};
use bitdash_ws::DataMessage;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{FeedError, FeedResult};

/// Accept a decimal sent as either a JSON string or number.
fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => parse_decimal(&s),
        Some(Value::Number(n)) => parse_decimal(&n.to_string()),
        _ => None,
    })
}

/// Accept an integer sent as either a JSON string or number.
fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s.trim().parse().ok(),
        Some(Value::Number(n)) => n.as_i64(),
        _ => None,
    })
}

/// Raw ticker item.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTicker {
    #[serde(default, alias = "symbol")]
    inst_id: Option<String>,
    #[serde(default, alias = "last", deserialize_with = "lenient_decimal")]
    last_pr: Option<Decimal>,
    #[serde(default, alias = "open", deserialize_with = "lenient_decimal")]
    open24h: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    high24h: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    low24h: Option<Decimal>,
    #[serde(default, alias = "baseVol", deserialize_with = "lenient_decimal")]
    base_volume: Option<Decimal>,
    #[serde(default, alias = "quoteVol", deserialize_with = "lenient_decimal")]
    quote_volume: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_i64")]
    ts: Option<i64>,
}

/// Raw books item.
#[derive(Debug, Deserialize)]
struct RawBook {
    #[serde(default)]
    bids: Option<Vec<Vec<String>>>,
    #[serde(default)]
    asks: Option<Vec<Vec<String>>>,
    #[serde(default, deserialize_with = "lenient_i64")]
    ts: Option<i64>,
    #[serde(default)]
    seq: Option<u64>,
}

/// Message parser.
pub struct MessageParser;

impl MessageParser {
    /// Parse a ticker frame.
    ///
    /// The symbol comes from the item's `instId`, falling back to the frame's
    /// subscription arg.
    pub fn parse_ticker(msg: &DataMessage) -> FeedResult<TickerUpdate> {
        let item = first_item(msg)?;
        let raw: RawTicker = serde_json::from_value(item.clone())?;

        let update = TickerUpdate {
            symbol: raw.inst_id.unwrap_or_else(|| msg.arg.inst_id.clone()),
            last_price: raw.last_pr.map(Price::new),
            open_24h: raw.open24h.map(Price::new),
            high_24h: raw.high24h.map(Price::new),
            low_24h: raw.low24h.map(Price::new),
            base_volume_24h: raw.base_volume,
            quote_volume_24h: raw.quote_volume,
            ts: raw.ts.or(msg.ts),
        };

        if update.is_empty() {
            return Err(FeedError::InvalidData(format!(
                "ticker for {} carries no fields",
                update.symbol
            )));
        }
        Ok(update)
    }

    /// Parse a books frame into a full snapshot.
    ///
    /// Both sides must be present; a frame missing either is rejected.
    pub fn parse_book(msg: &DataMessage) -> FeedResult<OrderBookSnapshot> {
        let item = first_item(msg)?;
        let raw: RawBook = serde_json::from_value(item.clone())?;

        let (bids, asks) = match (raw.bids, raw.asks) {
            (Some(bids), Some(asks)) => (bids, asks),
            _ => {
                return Err(FeedError::InvalidData(
                    "books item without bids and asks".to_string(),
                ))
            }
        };

        Ok(OrderBookSnapshot {
            bids: parse_levels(&bids)?,
            asks: parse_levels(&asks)?,
            ts: raw.ts.or(msg.ts),
            seq: raw.seq,
        })
    }
}

fn first_item(msg: &DataMessage) -> FeedResult<&Value> {
    msg.data
        .first()
        .ok_or_else(|| FeedError::ParseError(format!("empty data array for {}", msg.arg)))
}

fn parse_levels(levels: &[Vec<String>]) -> FeedResult<Vec<BookLevel>> {
    levels
        .iter()
        .map(|pair| BookLevel::from_pair(pair).map_err(FeedError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitdash_core::Size;
    use bitdash_ws::WsMessage;
    use rust_decimal_macros::dec;

    fn data(text: &str) -> DataMessage {
        match WsMessage::parse(text).unwrap() {
            WsMessage::Data(data) => data,
            other => panic!("expected data frame, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_ticker() {
        let msg = data(
            r#"{"action":"snapshot","arg":{"instType":"SPOT","channel":"ticker","instId":"BTCUSDT"},
            "data":[{"instId":"BTCUSDT","lastPr":"65000.5","open24h":"64000","high24h":"66000",
            "low24h":"63000","baseVolume":"1200","quoteVolume":"78000000","ts":"1700000000123"}],
            "ts":1700000000200}"#,
        );

        let update = MessageParser::parse_ticker(&msg).unwrap();
        assert_eq!(update.symbol, "BTCUSDT");
        assert_eq!(update.last_price, Some(Price::new(dec!(65000.5))));
        assert_eq!(update.open_24h, Some(Price::new(dec!(64000))));
        assert_eq!(update.base_volume_24h, Some(dec!(1200)));
        assert_eq!(update.ts, Some(1700000000123));
    }

    #[test]
    fn test_parse_ticker_legacy_names_and_partial() {
        let msg = data(
            r#"{"arg":{"channel":"ticker","instId":"ETHUSDT"},
            "data":[{"lastPr":"3000","baseVol":"10","quoteVol":""}]}"#,
        );

        let update = MessageParser::parse_ticker(&msg).unwrap();
        assert_eq!(update.symbol, "ETHUSDT");
        assert_eq!(update.base_volume_24h, Some(dec!(10)));
        assert!(update.quote_volume_24h.is_none());
        assert!(update.high_24h.is_none());
    }

    #[test]
    fn test_parse_ticker_rejects_empty() {
        let msg = data(r#"{"arg":{"channel":"ticker","instId":"BTCUSDT"},"data":[{"instId":"BTCUSDT"}]}"#);
        assert!(MessageParser::parse_ticker(&msg).is_err());

        let msg = data(r#"{"arg":{"channel":"ticker","instId":"BTCUSDT"},"data":[]}"#);
        assert!(MessageParser::parse_ticker(&msg).is_err());
    }

    #[test]
    fn test_parse_book() {
        let msg = data(
            r#"{"action":"snapshot","arg":{"instType":"SPOT","channel":"books","instId":"BTCUSDT"},
            "data":[{"bids":[["65000","0.5"],["64999","1.25"]],"asks":[["65001","2"]],
            "ts":"1700000000000","seq":42}]}"#,
        );

        let book = MessageParser::parse_book(&msg).unwrap();
        assert_eq!(book.bids.len(), 2);
        assert_eq!(book.asks.len(), 1);
        assert_eq!(book.bids[1].size, Size::new(dec!(1.25)));
        assert_eq!(book.ts, Some(1700000000000));
        assert_eq!(book.seq, Some(42));
    }

    #[test]
    fn test_parse_book_requires_both_sides() {
        let msg = data(r#"{"arg":{"channel":"books","instId":"BTCUSDT"},"data":[{"bids":[["1","1"]]}]}"#);
        assert!(MessageParser::parse_book(&msg).is_err());
    }

    #[test]
    fn test_parse_book_rejects_bad_level() {
        let msg = data(
            r#"{"arg":{"channel":"books","instId":"BTCUSDT"},"data":[{"bids":[["abc","1"]],"asks":[]}]}"#,
        );
        assert!(MessageParser::parse_book(&msg).is_err());
    }
}
