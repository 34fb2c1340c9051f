//! Application configuration.

use crate::error::{AppError, AppResult};
use bitdash_dashboard::DashboardConfig;
use bitdash_feed::MarketConfig;
use bitdash_rest::NewsConfig;
use bitdash_ws::StreamConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "BITDASH_CONFIG";
/// Config file used when neither `--config` nor [`CONFIG_ENV`] is set.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl AppConfig {
    /// Load configuration from `path`, or from [`CONFIG_ENV`] / [`DEFAULT_CONFIG_PATH`].
    ///
    /// A missing file yields defaults.
    pub fn load(path: Option<String>) -> AppResult<Self> {
        let config_path = path
            .or_else(|| std::env::var(CONFIG_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        if Path::new(&config_path).exists() {
            tracing::info!(path = %config_path, "Loading configuration");
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command line overrides.
    pub fn with_overrides(mut self, symbol: Option<String>, port: Option<u16>) -> Self {
        if let Some(symbol) = symbol {
            self.market.default_symbol = symbol.trim().to_uppercase();
        }
        if let Some(port) = port {
            self.dashboard.port = port;
        }
        self
    }

    fn validate(&self) -> AppResult<()> {
        if self.market.ticker_interval_ms == 0 || self.market.futures_interval_ms == 0 {
            return Err(AppError::Config("poll intervals must be positive".to_string()));
        }
        if self.dashboard.update_interval_ms == 0 {
            return Err(AppError::Config(
                "dashboard update interval must be positive".to_string(),
            ));
        }
        if self.market.default_symbol.trim().is_empty() {
            return Err(AppError::Config("default symbol is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.market.default_symbol, "BTCUSDT");
        assert_eq!(config.market.ticker_interval_ms, 10_000);
        assert_eq!(config.market.futures_interval_ms, 15_000);
        assert_eq!(config.news.limit, 8);
        assert!(config.dashboard.enabled);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [market]
            default_symbol = "ETHUSDT"

            [dashboard]
            port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(config.market.default_symbol, "ETHUSDT");
        assert_eq!(config.market.quote_coin, "USDT");
        assert_eq!(config.dashboard.port, 9000);
        assert_eq!(config.stream.heartbeat_interval_ms, 25_000);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(AppConfig::from_toml("[market]\nticker_interval_ms = 0").is_err());
        assert!(AppConfig::from_toml("[market\n").is_err());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::default().with_overrides(Some(" solusdt ".to_string()), Some(3000));
        assert_eq!(config.market.default_symbol, "SOLUSDT");
        assert_eq!(config.dashboard.port, 3000);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load(Some("does/not/exist.toml".to_string())).unwrap();
        assert_eq!(config.dashboard.port, 8080);
    }

    #[test]
    fn test_config_serialization() {
        let toml_str = toml::to_string(&AppConfig::default()).unwrap();
        assert!(toml_str.contains("[market]"));
        assert!(toml_str.contains("relay_url"));
    }

    #[test]
    fn test_shipped_config_parses() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/default.toml");
        let config = AppConfig::from_file(path).unwrap();
        assert_eq!(config.market.product_type, "umcbl");
    }
}
