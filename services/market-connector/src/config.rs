//! Feed service configuration

use serde::{Deserialize, Serialize};
use services_common::{FeedError, config::load_config};
use std::path::{Path, PathBuf};

/// Market-connector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Exchange feed host
    pub host: String,
    /// Exchange feed port
    pub port: u16,
    /// Symbol master CSV path
    pub symbol_master: PathBuf,
    /// Symbols to announce subscriptions for at startup
    pub symbols: Vec<String>,
    /// Ingress budget, messages per second
    pub max_message_rate: u32,
    /// Reconnect budget per minute
    pub max_connects_per_minute: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            host: "feed.nse.example.com".to_string(),
            port: 9899,
            symbol_master: PathBuf::from("config/symbols.csv"),
            symbols: vec![
                "RELIANCE".to_string(),
                "TCS".to_string(),
                "HDFCBANK".to_string(),
            ],
            max_message_rate: 10_000,
            max_connects_per_minute: 10,
        }
    }
}

impl FeedConfig {
    /// Load from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, FeedError> {
        load_config(path)
    }
}
