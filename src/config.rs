/// Service configuration with file and environment overrides

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// PumpPortal data feed endpoint.
    pub feed_url: String,
    /// Delay before reconnecting after the feed drops.
    pub reconnect_delay_secs: u64,
    /// Maximum number of token records held in memory (oldest evicted first).
    pub store_capacity: usize,
    /// How many raw feed payloads the diagnostic buffer retains.
    pub raw_log_capacity: usize,
    /// Depth of the bounded pipeline event queue.
    pub event_queue_depth: usize,
    /// Supply assumed when estimating market cap from price alone. This is an
    /// acknowledged approximation (1B, the pump.fun default), not a measured value.
    pub assumed_token_supply: f64,
    pub thresholds: CategoryThresholds,
    pub trending: TrendingConfig,
    /// Interval between batch price refreshes.
    pub price_refresh_secs: u64,
    pub price_api_url: String,
    pub candlestick_api_url: String,
    pub trade_api_url: String,
    pub listen_addr: String,
}

/// Market-cap boundaries for lifecycle classification. Both are inclusive
/// lower bounds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryThresholds {
    pub bonding: f64,
    pub graduated: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendingConfig {
    /// Below this many qualified entries, backfill with recent tokens.
    pub min_qualified: usize,
    /// Combined size ceiling applied during backfill.
    pub backfill_cap: usize,
    /// Hard cap on the trending list.
    pub cap: usize,
    /// Window for "recently created" qualification, in milliseconds.
    pub recent_window_ms: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: "wss://pumpportal.fun/api/data".to_string(),
            reconnect_delay_secs: 5,
            store_capacity: 150,
            raw_log_capacity: 20,
            event_queue_depth: 512,
            assumed_token_supply: 1_000_000_000.0,
            thresholds: CategoryThresholds::default(),
            trending: TrendingConfig::default(),
            price_refresh_secs: 30,
            price_api_url: "https://api.dexscreener.com/latest/dex/tokens".to_string(),
            candlestick_api_url: "https://api.mevx.io/api/v1/candlesticks".to_string(),
            trade_api_url: "https://pumpportal.fun/api/trade-local".to_string(),
            listen_addr: "127.0.0.1:3001".to_string(),
        }
    }
}

impl Default for CategoryThresholds {
    fn default() -> Self {
        Self {
            bonding: 10_000.0,
            graduated: 50_000.0,
        }
    }
}

impl Default for TrendingConfig {
    fn default() -> Self {
        Self {
            min_qualified: 10,
            backfill_cap: 20,
            cap: 50,
            recent_window_ms: 24 * 60 * 60 * 1000,
        }
    }
}

impl Config {
    pub fn load_from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Loads from the path in `CURVEBOARD_CONFIG` when set, otherwise defaults.
    pub fn load() -> Self {
        match std::env::var("CURVEBOARD_CONFIG") {
            Ok(path) => match Self::load_from_file(&path) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path);
                    config
                }
                Err(e) => {
                    warn!(error = %e, path = %path, "Failed to load config file, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}
