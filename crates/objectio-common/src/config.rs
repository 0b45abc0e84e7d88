//! Configuration types for ObjectIO healing
//!
//! Every field has a serde default so partial TOML files are accepted.

use crate::types::HealScanMode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Healing pass configuration
    #[serde(default)]
    pub heal: HealConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Healing pass configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealConfig {
    /// Verification depth for shard data
    #[serde(default)]
    pub scan_mode: HealScanMode,
    /// Per-disk deadline for metadata reads and verification (milliseconds)
    #[serde(default = "default_disk_timeout_ms")]
    pub disk_timeout_ms: u64,
}

impl HealConfig {
    /// Per-disk deadline as a [`Duration`]
    #[must_use]
    pub const fn disk_timeout(&self) -> Duration {
        Duration::from_millis(self.disk_timeout_ms)
    }
}

impl Default for HealConfig {
    fn default() -> Self {
        Self {
            scan_mode: HealScanMode::default(),
            disk_timeout_ms: default_disk_timeout_ms(),
        }
    }
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

const fn default_disk_timeout_ms() -> u64 {
    30_000
}

fn default_log_level() -> String {
    "info".to_string()
}
