//! HTTP client for the exchange public REST API.
//!
//! Every endpoint answers with the envelope
//! `{"code":"00000","msg":"success","requestTime":..,"data":[..]}`.
//! Numeric fields arrive as strings; unparseable values become `None`
//! rather than failing the whole row.

use bitdash_core::{parse_decimal, FuturesRow, Price, Symbol, TickerSnapshot};
use bitdash_telemetry::Metrics;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{RestError, RestResult};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Success code in the response envelope.
const SUCCESS_CODE: &str = "00000";

const SYMBOLS_PATH: &str = "/spot/public/symbols";
const SPOT_TICKERS_PATH: &str = "/spot/market/tickers";
const FUTURES_TICKERS_PATH: &str = "/mix/market/tickers";

/// Response envelope.
#[derive(Debug, Deserialize)]
struct Envelope {
    code: String,
    #[serde(default)]
    msg: Option<String>,
    #[serde(rename = "requestTime", default)]
    request_time: Option<i64>,
    #[serde(default)]
    data: Option<Vec<serde_json::Value>>,
}

/// Raw spot symbol row.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSymbol {
    symbol: String,
    #[serde(default)]
    base_coin: String,
    #[serde(default)]
    quote_coin: String,
    #[serde(default)]
    min_trade_amount: Option<String>,
    #[serde(default)]
    maker_fee_rate: Option<String>,
    #[serde(default)]
    taker_fee_rate: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl From<RawSymbol> for Symbol {
    fn from(raw: RawSymbol) -> Self {
        Self {
            symbol: raw.symbol,
            base_coin: raw.base_coin,
            quote_coin: raw.quote_coin,
            min_trade_amount: decimal(&raw.min_trade_amount),
            maker_fee_rate: decimal(&raw.maker_fee_rate),
            taker_fee_rate: decimal(&raw.taker_fee_rate),
            status: raw.status,
        }
    }
}

/// Raw spot ticker row.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSpotTicker {
    symbol: String,
    #[serde(default)]
    last_pr: Option<String>,
    #[serde(default, alias = "open")]
    open24h: Option<String>,
    #[serde(default)]
    high24h: Option<String>,
    #[serde(default)]
    low24h: Option<String>,
    #[serde(default, alias = "baseVol")]
    base_volume: Option<String>,
    #[serde(default, alias = "quoteVol")]
    quote_volume: Option<String>,
}

impl From<RawSpotTicker> for TickerSnapshot {
    fn from(raw: RawSpotTicker) -> Self {
        Self {
            symbol: raw.symbol,
            last_price: price(&raw.last_pr),
            open_24h: price(&raw.open24h),
            high_24h: price(&raw.high24h),
            low_24h: price(&raw.low24h),
            base_volume_24h: decimal(&raw.base_volume),
            quote_volume_24h: decimal(&raw.quote_volume),
        }
    }
}

/// Raw futures ticker row.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFuturesTicker {
    #[serde(alias = "instId")]
    symbol: String,
    #[serde(default, alias = "last")]
    last_pr: Option<String>,
    #[serde(default, alias = "chgUtc")]
    change24h: Option<String>,
    #[serde(default, alias = "quoteVol24h")]
    quote_volume: Option<String>,
    /// Older rows carry only the USDT volume.
    #[serde(default)]
    usdt_volume: Option<String>,
}

impl From<RawFuturesTicker> for FuturesRow {
    fn from(raw: RawFuturesTicker) -> Self {
        Self {
            instrument_id: raw.symbol,
            last_price: price(&raw.last_pr),
            change_24h: decimal(&raw.change24h),
            quote_volume_24h: decimal(&raw.quote_volume).or_else(|| decimal(&raw.usdt_volume)),
        }
    }
}

fn decimal(raw: &Option<String>) -> Option<Decimal> {
    raw.as_deref().and_then(parse_decimal)
}

fn price(raw: &Option<String>) -> Option<Price> {
    decimal(raw).map(Price::new)
}

/// Client for the exchange public REST API.
pub struct MarketClient {
    /// HTTP client.
    client: Client,
    /// Base URL (e.g., "https://api.bitget.com/api/v2").
    base_url: String,
}

impl MarketClient {
    /// Create a new market client.
    pub fn new(base_url: impl Into<String>) -> RestResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| RestError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch spot symbols quoted in `quote_coin`.
    pub async fn list_symbols(&self, quote_coin: &str) -> RestResult<Vec<Symbol>> {
        let rows: Vec<RawSymbol> = self.get_rows("symbols", SYMBOLS_PATH, &[]).await?;
        let symbols: Vec<Symbol> = rows
            .into_iter()
            .filter(|row| row.quote_coin == quote_coin)
            .map(Symbol::from)
            .collect();
        debug!(count = symbols.len(), quote_coin, "Fetched symbols");
        Ok(symbols)
    }

    /// Fetch every spot ticker.
    pub async fn fetch_spot_tickers(&self) -> RestResult<Vec<TickerSnapshot>> {
        let rows: Vec<RawSpotTicker> = self
            .get_rows("spot_tickers", SPOT_TICKERS_PATH, &[])
            .await?;
        Ok(rows.into_iter().map(TickerSnapshot::from).collect())
    }

    /// Fetch every futures ticker of a product type (e.g., "umcbl").
    pub async fn fetch_futures_tickers(&self, product_type: &str) -> RestResult<Vec<FuturesRow>> {
        let rows: Vec<RawFuturesTicker> = self
            .get_rows(
                "futures_tickers",
                FUTURES_TICKERS_PATH,
                &[("productType", product_type)],
            )
            .await?;
        Ok(rows.into_iter().map(FuturesRow::from).collect())
    }

    /// GET an endpoint and decode the envelope's `data` rows, recording the outcome.
    async fn get_rows<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> RestResult<Vec<T>> {
        let result = self.get_rows_inner(endpoint, path, query).await;
        Metrics::rest_request(endpoint, result.is_ok());
        result
    }

    async fn get_rows_inner<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> RestResult<Vec<T>> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| RestError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RestError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| RestError::HttpClient(format!("Failed to parse response: {e}")))?;

        if envelope.code != SUCCESS_CODE {
            return Err(RestError::Api {
                code: envelope.code,
                msg: envelope.msg.unwrap_or_default(),
            });
        }

        let data = envelope.data.unwrap_or_default();
        let total = data.len();
        let rows: Vec<T> = data
            .into_iter()
            .filter_map(|value| match serde_json::from_value(value) {
                Ok(row) => Some(row),
                Err(e) => {
                    debug!(endpoint, error = %e, "Skipping malformed row");
                    None
                }
            })
            .collect();

        if rows.len() < total {
            warn!(endpoint, skipped = total - rows.len(), "Skipped malformed rows");
        }
        debug!(
            endpoint,
            rows = rows.len(),
            request_time = ?envelope.request_time,
            "REST response"
        );
        Ok(rows)
    }
}
