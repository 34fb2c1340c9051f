//! View-model rendering.
//!
//! Turns `MarketState` into display cards. Missing values render as `"-"`;
//! prices are shown as received, volumes and sizes with magnitude suffixes.

use bitdash_core::{
    fmt, fmt_decimal, instrument_label, BookLevel, FuturesRow, OrderBookSnapshot, Price, Symbol,
    TickerSnapshot,
};
use bitdash_feed::MarketState;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::types::{
    DashboardSnapshot, DepthCard, DepthLevelView, Direction, FuturesRowView, PriceCard,
    SelectorCard, SymbolRowView,
};

/// Rows in the futures table.
pub const FUTURES_LIMIT: usize = 10;
/// Depth levels shown per side.
pub const DEPTH_LEVELS: usize = 12;
/// Rows in the symbol table.
pub const SYMBOL_LIMIT: usize = 200;

const MISSING: &str = "-";

fn raw_price(value: Option<Price>) -> String {
    value.map_or_else(|| MISSING.to_string(), |p| p.to_string())
}

fn raw_decimal(value: Option<Decimal>) -> String {
    value.map_or_else(|| MISSING.to_string(), |d| d.normalize().to_string())
}

/// Render the whole dashboard.
pub fn render_snapshot(market: &MarketState, contract_suffix: &str) -> DashboardSnapshot {
    let symbols = market.symbols();
    let selected = market.selected_symbol();

    DashboardSnapshot {
        timestamp_ms: chrono::Utc::now().timestamp_millis(),
        selector: render_selector(&symbols, selected.clone()),
        price: render_price(market.spot_ticker().as_ref()),
        futures: render_futures(&market.ranked_futures(FUTURES_LIMIT), contract_suffix),
        depth: render_depth(selected, &market.book()),
        symbols: render_symbols(&symbols),
        news: market.news(),
        streams: market.stream_statuses(),
    }
}

pub fn render_selector(symbols: &[Symbol], selected: Option<String>) -> SelectorCard {
    SelectorCard {
        selected,
        symbols: symbols.iter().map(|s| s.symbol.clone()).collect(),
    }
}

/// Price summary of the selected instrument.
pub fn render_price(ticker: Option<&TickerSnapshot>) -> PriceCard {
    let change = ticker.map_or(0.0, TickerSnapshot::change_pct);

    PriceCard {
        symbol: ticker.map(|t| t.symbol.clone()),
        last: raw_price(ticker.and_then(|t| t.last_price)),
        change_pct: fmt(Some(change), 2),
        direction: Direction::of(change),
        high: raw_price(ticker.and_then(|t| t.high_24h)),
        low: raw_price(ticker.and_then(|t| t.low_24h)),
        base_volume: fmt_decimal(ticker.and_then(|t| t.base_volume_24h), 2),
        quote_volume: fmt_decimal(ticker.and_then(|t| t.quote_volume_24h), 2),
    }
}

/// Futures table rows, already ranked.
pub fn render_futures(rows: &[FuturesRow], contract_suffix: &str) -> Vec<FuturesRowView> {
    rows.iter()
        .map(|row| {
            // change_24h is a ratio.
            let change = row
                .change_24h
                .and_then(|c| c.checked_mul(Decimal::ONE_HUNDRED))
                .and_then(|c| c.to_f64())
                .unwrap_or(0.0);
            FuturesRowView {
                instrument_id: row.instrument_id.clone(),
                label: instrument_label(&row.instrument_id, contract_suffix).to_string(),
                last: raw_price(row.last_price),
                change_pct: fmt(Some(change), 2),
                direction: Direction::of(change),
                volume: fmt_decimal(row.quote_volume_24h, 2),
            }
        })
        .collect()
}

/// Depth bars. Widths are relative to the largest size across both sides.
pub fn render_depth(symbol: Option<String>, book: &OrderBookSnapshot) -> DepthCard {
    let max = book.max_size().to_f64().filter(|m| *m > 0.0).unwrap_or(1.0);

    let side = |levels: &[BookLevel]| -> Vec<DepthLevelView> {
        levels
            .iter()
            .take(DEPTH_LEVELS)
            .map(|level| {
                let size = level.size.to_f64();
                DepthLevelView {
                    price: level.price.to_string(),
                    size: fmt(size, 4),
                    width_pct: (size.unwrap_or(0.0) / max * 100.0).min(100.0),
                }
            })
            .collect()
    };

    DepthCard {
        symbol,
        bids: side(&book.bids),
        asks: side(&book.asks),
        seq: book.seq,
        ts: book.ts,
    }
}

/// Symbol table rows (first [`SYMBOL_LIMIT`]).
pub fn render_symbols(symbols: &[Symbol]) -> Vec<SymbolRowView> {
    symbols
        .iter()
        .take(SYMBOL_LIMIT)
        .map(|s| SymbolRowView {
            symbol: s.symbol.clone(),
            min_trade_amount: raw_decimal(s.min_trade_amount),
            maker_fee_rate: raw_decimal(s.maker_fee_rate),
            taker_fee_rate: raw_decimal(s.taker_fee_rate),
        })
        .collect()
}
