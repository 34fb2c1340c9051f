//! Dashboard configuration.

use serde::{Deserialize, Serialize};

/// Dashboard server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Enable dashboard server.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Update interval in milliseconds for WebSocket broadcasts.
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
    /// Maximum concurrent WebSocket connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_update_interval_ms() -> u64 {
    1000
}

fn default_max_connections() -> usize {
    10
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            host: default_host(),
            port: default_port(),
            update_interval_ms: default_update_interval_ms(),
            max_connections: default_max_connections(),
        }
    }
}

impl DashboardConfig {
    /// `host:port` to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
