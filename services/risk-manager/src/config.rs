//! Risk manager configuration

use crate::RiskLimits;
use serde::{Deserialize, Serialize};
use services_common::{FeedError, config::load_config};
use std::path::Path;

/// Escalation thresholds as fractions of the hard limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// First warning level (fraction of the limit)
    pub warn_fraction: f64,
    /// Second warning level (fraction of the limit)
    pub critical_fraction: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            warn_fraction: 0.8,
            critical_fraction: 0.9,
        }
    }
}

/// Risk manager configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Hard risk limits
    pub limits: RiskLimits,
    /// Escalation thresholds
    pub alerts: AlertThresholds,
}

impl RiskConfig {
    /// Load from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, FeedError> {
        load_config(path)
    }
}
