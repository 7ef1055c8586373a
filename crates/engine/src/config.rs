//! Engine configuration
//!
//! Loaded from a JSON file. Every field has a default, so a partial file (or
//! `{}`) is a valid configuration.

use crate::error::ConfigError;
use argus_core::Feature;
use argus_detection::{DEFAULT_BUFFER_CAPACITY, FeatureConfig, IsolationForestConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Root configuration for the surveillance engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Max events kept in the aggregation buffer
    pub buffer_capacity: usize,
    /// Aggregation window length
    pub window_secs: u64,
    /// Anomaly scores strictly above this flag a vector as anomalous
    pub anomaly_threshold: f64,
    /// Features used for baselines and as scorer columns
    pub tracked_features: Vec<String>,
    /// Directory of `*.json` rule definitions
    pub rules_dir: PathBuf,
    /// Per-subscriber queue bound on the trade and case streams
    pub subscriber_capacity: usize,
    pub features: FeatureConfig,
    pub scorer: IsolationForestConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            window_secs: 300,
            anomaly_threshold: 0.8,
            tracked_features: vec![
                Feature::NumTrades.name().to_string(),
                Feature::BuySellRatio.name().to_string(),
                Feature::AvgQuantity.name().to_string(),
                Feature::VenueSwitchCount.name().to_string(),
            ],
            rules_dir: PathBuf::from("rules"),
            subscriber_capacity: 1024,
            features: FeatureConfig::default(),
            scorer: IsolationForestConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load and validate configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Load and validate configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_capacity == 0 {
            return Err(ConfigError::Invalid("buffer_capacity must be > 0".into()));
        }
        if self.window_secs == 0 {
            return Err(ConfigError::Invalid("window_secs must be > 0".into()));
        }
        if self.subscriber_capacity == 0 {
            return Err(ConfigError::Invalid(
                "subscriber_capacity must be > 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.anomaly_threshold) {
            return Err(ConfigError::Invalid(format!(
                "anomaly_threshold {} outside [0, 1]",
                self.anomaly_threshold
            )));
        }
        if let Some(unknown) = self
            .tracked_features
            .iter()
            .find(|name| name.parse::<Feature>().is_err())
        {
            return Err(ConfigError::Invalid(format!(
                "unknown tracked feature {unknown:?}"
            )));
        }
        Ok(())
    }

    pub fn window_ns(&self) -> i64 {
        i64::try_from(self.window_secs)
            .unwrap_or(i64::MAX / NANOS_PER_SEC)
            .saturating_mul(NANOS_PER_SEC)
    }
}
