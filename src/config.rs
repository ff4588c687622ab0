// In: src/config.rs

//! The single source of truth for pipeline-engine configuration.
//!
//! `StrataConfig` is created once at the application boundary (e.g. parsed from a
//! JSON file) and then passed down through the system via a shared, read-only
//! `Arc<StrataConfig>`. Pipelines hand it to every filter's execute step, and the
//! persistence layer reads its payload-compression settings from it.

use serde::{Deserialize, Serialize};

use crate::error::Result;

//==================================================================================
// I. The Unified StrataConfig
//==================================================================================

/// Engine-wide settings. Every field has a serde default, so a partial JSON
/// document (or `{}`) is a valid configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct StrataConfig {
    /// Number of tuples a long-running filter processes between two polls of
    /// the cancellation flag.
    #[serde(default = "default_cancel_poll_interval")]
    pub cancel_poll_interval: usize,

    /// Number of tuples between two progress callbacks.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,

    /// If true, array payloads are zstd-compressed when written to disk.
    #[serde(default = "default_true")]
    pub compress_payloads: bool,

    /// The zstd level used for payload compression.
    #[serde(default = "default_compression_level")]
    pub compression_level: i32,

    /// Optional log level handed to `enable_verbose_logging`.
    #[serde(default)]
    pub log_level: Option<String>,
}

// Default implementation to make constructing the config easier.
impl Default for StrataConfig {
    fn default() -> Self {
        Self {
            cancel_poll_interval: default_cancel_poll_interval(),
            progress_interval: default_progress_interval(),
            compress_payloads: true,
            compression_level: default_compression_level(),
            log_level: None,
        }
    }
}

impl StrataConfig {
    /// Parses a configuration from JSON, filling missing fields with defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut config: StrataConfig = serde_json::from_str(json)?;
        // A zero interval would poll on every tuple forever; clamp to one.
        config.cancel_poll_interval = config.cancel_poll_interval.max(1);
        config.progress_interval = config.progress_interval.max(1);
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Helper for `serde` to default a boolean field to true.
fn default_true() -> bool {
    true
}

fn default_cancel_poll_interval() -> usize {
    4096
}

fn default_progress_interval() -> usize {
    65_536
}

fn default_compression_level() -> i32 {
    3
}
