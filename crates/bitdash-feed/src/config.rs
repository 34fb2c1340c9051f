//! Market data configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// `[market]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// REST API base URL.
    #[serde(default = "default_rest_url")]
    pub rest_url: String,
    /// Only symbols quoted in this coin are listed.
    #[serde(default = "default_quote_coin")]
    pub quote_coin: String,
    /// Instrument selected at startup.
    #[serde(default = "default_symbol")]
    pub default_symbol: String,
    /// Spot ticker poll interval.
    #[serde(default = "default_ticker_interval_ms")]
    pub ticker_interval_ms: u64,
    /// Futures ticker poll interval.
    #[serde(default = "default_futures_interval_ms")]
    pub futures_interval_ms: u64,
    /// Futures product type (e.g., "umcbl").
    #[serde(default = "default_product_type")]
    pub product_type: String,
    /// Suffix stripped from futures ids for display.
    #[serde(default = "default_contract_suffix")]
    pub contract_suffix: String,
}

fn default_rest_url() -> String {
    "https://api.bitget.com/api/v2".to_string()
}

fn default_quote_coin() -> String {
    "USDT".to_string()
}

fn default_symbol() -> String {
    "BTCUSDT".to_string()
}

fn default_ticker_interval_ms() -> u64 {
    10_000
}

fn default_futures_interval_ms() -> u64 {
    15_000
}

fn default_product_type() -> String {
    "umcbl".to_string()
}

fn default_contract_suffix() -> String {
    "_UMCBL".to_string()
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            rest_url: default_rest_url(),
            quote_coin: default_quote_coin(),
            default_symbol: default_symbol(),
            ticker_interval_ms: default_ticker_interval_ms(),
            futures_interval_ms: default_futures_interval_ms(),
            product_type: default_product_type(),
            contract_suffix: default_contract_suffix(),
        }
    }
}

impl MarketConfig {
    pub fn ticker_interval(&self) -> Duration {
        Duration::from_millis(self.ticker_interval_ms.max(1))
    }

    pub fn futures_interval(&self) -> Duration {
        Duration::from_millis(self.futures_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MarketConfig::default();
        assert_eq!(config.ticker_interval(), Duration::from_secs(10));
        assert_eq!(config.futures_interval(), Duration::from_secs(15));
        assert_eq!(config.contract_suffix, "_UMCBL");
    }

    #[test]
    fn test_partial_section() {
        let config: MarketConfig = serde_json::from_str(r#"{"default_symbol":"ETHUSDT"}"#).unwrap();
        assert_eq!(config.default_symbol, "ETHUSDT");
        assert_eq!(config.quote_coin, "USDT");
    }
}
